use std::fmt;

use serde::{Deserialize, Serialize};

/// Listing status shown on the property card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Available,
    Pending,
    Sold,
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyStatus::Available => "available",
            PropertyStatus::Pending => "pending",
            PropertyStatus::Sold => "sold",
        };
        f.write_str(s)
    }
}

/// A catalog listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub title: String,
    pub address: String,
    pub status: PropertyStatus,
    /// Display text, e.g. `"$1,895,000"`.
    pub price: String,
    pub beds: u32,
    pub baths: f32,
    /// Interior area in square feet.
    pub area: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub highlights: Vec<String>,
}

impl Property {
    /// Snapshot of the display fields used for prompt context.
    pub fn focus(&self) -> PropertyFocus {
        PropertyFocus {
            title: self.title.clone(),
            address: self.address.clone(),
            status: self.status,
            price: self.price.clone(),
            beds: self.beds,
            baths: self.baths,
            area: self.area,
            highlights: self.highlights.clone(),
        }
    }
}

/// The currently selected property, as sent alongside a chat request.
///
/// Deserializes from a full [`Property`] record as well; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFocus {
    pub title: String,
    pub address: String,
    pub status: PropertyStatus,
    pub price: String,
    pub beds: u32,
    pub baths: f32,
    pub area: u32,
    #[serde(default)]
    pub highlights: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
fn listing(
    id: &str,
    title: &str,
    address: &str,
    status: PropertyStatus,
    price: &str,
    (beds, baths, area): (u32, f32, u32),
    (latitude, longitude): (f64, f64),
    highlights: &[&str],
) -> Property {
    Property {
        id: id.to_string(),
        title: title.to_string(),
        address: address.to_string(),
        status,
        price: price.to_string(),
        beds,
        baths,
        area,
        latitude,
        longitude,
        highlights: highlights.iter().map(|h| h.to_string()).collect(),
    }
}

/// The fixed listing catalog.
pub fn catalog() -> Vec<Property> {
    vec![
        listing(
            "pac-heights-victorian",
            "Pacific Heights Victorian",
            "2418 Broadway St, San Francisco, CA 94115",
            PropertyStatus::Available,
            "$4,250,000",
            (5, 4.5, 4120),
            (37.7946, -122.4339),
            &[
                "Restored 1890s facade with bay views from the top floor",
                "Chef's kitchen opening to a landscaped south-facing garden",
                "Two-car garage plus an in-law suite with separate entry",
            ],
        ),
        listing(
            "mission-bay-loft",
            "Mission Bay Waterfront Loft",
            "355 Berry St #512, San Francisco, CA 94158",
            PropertyStatus::Pending,
            "$1,185,000",
            (2, 2.0, 1280),
            (37.7740, -122.3935),
            &[
                "Floor-to-ceiling windows over Mission Creek",
                "Walk to Chase Center, UCSF, and Caltrain",
                "Building gym, roof deck, and 24-hour concierge",
            ],
        ),
        listing(
            "noe-valley-craftsman",
            "Noe Valley Craftsman",
            "4127 24th St, San Francisco, CA 94114",
            PropertyStatus::Available,
            "$2,395,000",
            (3, 2.0, 1960),
            (37.7515, -122.4354),
            &[
                "Original built-ins and a remodeled primary suite",
                "Steps to 24th Street cafes and the J-Church line",
                "Deep lot with permitted ADU plans",
            ],
        ),
        listing(
            "outer-sunset-ocean-view",
            "Outer Sunset Ocean-View Home",
            "1847 47th Ave, San Francisco, CA 94122",
            PropertyStatus::Sold,
            "$1,620,000",
            (3, 2.5, 1740),
            (37.7531, -122.5068),
            &[
                "Top-floor great room with Pacific views",
                "Two blocks to Ocean Beach and the Great Highway park",
                "Solar array with battery backup",
            ],
        ),
    ]
}

/// Look up a catalog listing by id.
pub fn find_property(id: &str) -> Option<Property> {
    catalog().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_ids_unique() {
        let properties = catalog();
        let mut ids: Vec<&str> = properties.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), properties.len());
    }

    #[test]
    fn test_find_property() {
        let found = find_property("noe-valley-craftsman").unwrap();
        assert_eq!(found.title, "Noe Valley Craftsman");
        assert!(find_property("missing").is_none());
    }

    #[test]
    fn test_focus_deserializes_from_full_record() {
        let property = catalog().remove(0);
        let value = serde_json::to_value(&property).unwrap();
        let focus: PropertyFocus = serde_json::from_value(value).unwrap();
        assert_eq!(focus, property.focus());
    }

    #[test]
    fn test_status_wire_format() {
        let value = serde_json::to_value(PropertyStatus::Pending).unwrap();
        assert_eq!(value, json!("pending"));
        assert_eq!(PropertyStatus::Sold.to_string(), "sold");
    }
}
