use super::*;

#[test]
fn parses_chat_routes() {
    assert_eq!(Route::parse("/"), Some(Route::Chat(None)));
    assert_eq!(Route::parse("/chat"), Some(Route::Chat(None)));
    assert_eq!(
        Route::parse("/chat/12"),
        Some(Route::Chat(Some(ConversationId(12))))
    );
    assert_eq!(Route::parse("/chat/abc"), None);
    assert_eq!(Route::parse("/chat/0"), None);
    assert_eq!(Route::parse("/chat/-3"), None);
    assert_eq!(
        Route::parse("/chat/7?draft=1"),
        Some(Route::Chat(Some(ConversationId(7))))
    );
}

#[test]
fn decodes_search_queries() {
    assert_eq!(
        Route::parse("/search/bluetooth%20headphones"),
        Some(Route::Search(Some("bluetooth headphones".into())))
    );
    assert_eq!(Route::parse("/search"), Some(Route::Search(None)));
    assert_eq!(Route::parse("/search/%20%20"), Some(Route::Search(None)));
    assert_eq!(Route::parse("/settings/profile"), None);
}

#[test]
fn paths_round_trip_through_encoding() {
    let route = Route::Search(Some("usb-c cable / 2m & fast".into()));
    let path = route.to_path();
    assert!(!path["/search/".len()..].contains('/'));
    assert_eq!(Route::parse(&path), Some(route));

    assert_eq!(Route::Chat(Some(ConversationId(4))).to_path(), "/chat/4");
    assert_eq!(Route::Chat(None).to_path(), "/");
}
