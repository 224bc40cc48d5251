//! Sample items as the analysis backend would extract them

#![allow(dead_code)]

use listing_flow::models::item::ExtractedItem;

fn item(name: &str, category: &str, price: f64, timestamp: f64) -> ExtractedItem {
    ExtractedItem {
        name: name.to_string(),
        category: category.to_string(),
        condition: "good".to_string(),
        estimated_price: price,
        confidence: Some(0.85),
        frame_data: None,
        timestamp: Some(timestamp),
    }
}

/// "ItemA" of the reference scenario
pub fn item_a() -> ExtractedItem {
    item("Mid-century armchair", "furniture", 120.0, 2.5)
}

/// "ItemB" of the reference scenario
pub fn item_b() -> ExtractedItem {
    item("Brass desk lamp", "home", 35.0, 7.0)
}

pub fn room_items() -> Vec<ExtractedItem> {
    vec![
        item_a(),
        item_b(),
        item("Road bike", "sports", 240.0, 11.0),
        item("Espresso machine", "appliances", 80.0, 15.5),
    ]
}
