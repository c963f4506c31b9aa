use super::contacts::HubSpotContact;
use crate::integrations::IntegrationItem;

/// Item type assigned to every HubSpot contact
pub const CONTACT_ITEM_TYPE: &str = "contact";

/// Transform a HubSpot contact into an integration item.
///
/// Name is `firstname + " " + lastname`; a missing first name reads
/// "Unnamed", a missing last name reads "". The space is always present.
pub fn contact_to_item(contact: &HubSpotContact) -> IntegrationItem {
    let properties = &contact.properties;
    let first = properties.firstname.as_deref().unwrap_or("Unnamed");
    let last = properties.lastname.as_deref().unwrap_or("");

    IntegrationItem {
        id: contact.id.clone(),
        item_type: CONTACT_ITEM_TYPE.to_string(),
        name: format!("{} {}", first, last),
        creation_time: properties.createdate.clone(),
        last_modified_time: properties.lastmodifieddate.clone(),
        parent_id: None,
    }
}
