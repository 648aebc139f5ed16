//! Catalog category ids and their genre names.

use shared::NOT_AVAILABLE;

/// Genre name for a catalog category id, if the id is known
pub fn category_name(category_id: &str) -> Option<&'static str> {
    let name = match category_id {
        "1" => "Film & Animation",
        "2" => "Autos & Vehicles",
        "10" => "Music",
        "15" => "Pets & Animals",
        "17" => "Sports",
        "19" => "Travel & Events",
        "20" => "Gaming",
        "22" => "People & Blogs",
        "23" => "Comedy",
        "24" => "Entertainment",
        "25" => "News & Politics",
        "26" => "Howto & Style",
        "27" => "Education",
        "28" => "Science & Technology",
        "29" => "Nonprofits & Activism",
        _ => return None,
    };
    Some(name)
}

/// Genre name for a category id, `"N/A"` when unknown
pub fn genre_or_na(category_id: &str) -> &'static str {
    category_name(category_id).unwrap_or(NOT_AVAILABLE)
}
