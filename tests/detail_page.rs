use play_parser::{app_details_from_page, parse_page, FieldRegistry, FieldRule, Transform};
use serde_json::{json, Value};

fn put(tree: &mut Value, path: &[usize], leaf: Value) {
    match path.split_first() {
        None => *tree = leaf,
        Some((&first, rest)) => {
            if !tree.is_array() {
                *tree = Value::Array(Vec::new());
            }
            let items = tree.as_array_mut().unwrap();
            if items.len() <= first {
                items.resize(first + 1, Value::Null);
            }
            put(&mut items[first], rest, leaf);
        }
    }
}

fn callback(key: &str, data: &Value) -> String {
    format!(
        "<script nonce=\"n\">AF_initDataCallback({{key: '{key}', hash: '0', data:{data}, sideChannel: {{}}}});</script>"
    )
}

fn detail_page() -> String {
    let mut app = Value::Null;
    put(&mut app, &[0, 0], json!("Puzzle Quest"));
    put(&mut app, &[12, 0, 0, 1], json!("Match gems &amp; win<br>Offline play"));
    put(&mut app, &[13, 0], json!("1,000,000+"));
    put(&mut app, &[13, 1], json!(1_000_000));
    put(&mut app, &[51, 0, 1], json!(4.4));
    for stars in 1..=5 {
        put(&mut app, &[51, 1, stars, 1], json!(stars * 100));
    }
    put(&mut app, &[57, 0, 0, 0, 0, 1, 0, 0], json!(0));
    put(&mut app, &[57, 0, 0, 0, 0, 1, 0, 1], json!("USD"));
    put(&mut app, &[68, 0], json!("Gem Studio"));
    put(&mut app, &[68, 1, 4, 2], json!("/store/apps/developer?id=Gem+Studio"));
    put(&mut app, &[78, 0, 0, 3, 2], json!("https://img/shot1"));
    put(&mut app, &[78, 0, 1, 3, 2], json!("https://img/shot2"));
    put(&mut app, &[79, 0, 0, 0], json!("Puzzle"));
    put(&mut app, &[79, 0, 0, 2], json!("GAME_PUZZLE"));
    put(
        &mut app,
        &[118],
        json!([[["Puzzle", null, "GAME_PUZZLE", null]], [[["Casual", null, "GAME_CASUAL", null]]]]),
    );
    put(&mut app, &[48], json!(1));

    let mut ds5 = Value::Null;
    put(&mut ds5, &[1, 2], app);
    let site = json!([null, null, null, null, "GB", "en_GB"]);

    format!(
        "<html><head>{}{}</head><body></body></html>",
        callback("ds:5", &ds5),
        callback("ds:11", &site)
    )
}

#[test]
fn test_detail_page_end_to_end() {
    let result = app_details_from_page("com.gem.puzzle", &detail_page()).unwrap();

    assert_eq!(result.get("appId"), Some(&json!("com.gem.puzzle")));
    assert_eq!(result.get("siteLocation"), Some(&json!("GB")));
    assert_eq!(result.get("title"), Some(&json!("Puzzle Quest")));
    assert_eq!(result.get("description"), Some(&json!("Match gems & win\r\nOffline play")));
    assert_eq!(result.get("installs"), Some(&json!("1,000,000+")));
    assert_eq!(result.get("histogram"), Some(&json!([100, 200, 300, 400, 500])));
    assert_eq!(result.get("price"), Some(&json!(0)));
    assert_eq!(result.get("free"), Some(&json!(true)));
    assert_eq!(result.get("developerId"), Some(&json!("Gem Studio")));
    assert_eq!(
        result.get("screenshots"),
        Some(&json!(["https://img/shot1", "https://img/shot2"]))
    );
    assert_eq!(
        result.get("categories"),
        Some(&json!([
            {"name": "Puzzle", "id": "GAME_PUZZLE"},
            {"name": "Casual", "id": "GAME_CASUAL"}
        ]))
    );
    assert_eq!(result.get("containsAds"), Some(&json!(true)));
    assert_eq!(result.get("version"), Some(&json!("Varies with device")));
}

#[test]
fn test_detail_page_serializes_flat() {
    let result = app_details_from_page("com.gem.puzzle", &detail_page()).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["title"], json!("Puzzle Quest"));
    assert!(json.get("values").is_none());
}

#[test]
fn test_custom_catalog_against_page() {
    let payload = parse_page(&detail_page()).unwrap();
    let mut registry = FieldRegistry::new();
    registry
        .insert(
            "minInstalls",
            FieldRule::ds(5, &[1, 2, 13, 0]).with_transform(Transform::Digits),
        )
        .insert(
            "rating",
            FieldRule::ds(6, &[0]).or_rule(FieldRule::ds(5, &[1, 2, 51, 0, 1])),
        );

    let result = registry.extract_all(&payload);
    assert_eq!(result.get("minInstalls"), Some(&json!(1_000_000)));
    assert_eq!(result.get("rating"), Some(&json!(4.4)));
}
