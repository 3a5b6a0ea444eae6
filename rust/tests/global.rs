//! The process-wide instance. Kept to a single test so nothing else in this
//! binary touches the global state or the environment concurrently.

use serde_json::json;
use sst_resource::global::{self, InstallError};
use sst_resource::{ResourceError, Resources, Source};

#[test]
fn resolves_once_and_rejects_late_seeding() {
    std::env::set_var("SST_RESOURCE_App", r#"{"name":"shop","stage":"test"}"#);
    std::env::set_var("SST_RESOURCE_Api", r#"{"url":"https://env.example"}"#);
    std::env::remove_var("SST_KEY_FILE");
    std::env::remove_var("SST_KEY");

    let links = match json!({ "Api": { "url": "https://injected" }, "Cache": { "host": "localhost" } }) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    global::inject_links(links.clone()).expect("first seed");
    assert_eq!(global::inject_links(links), Err(InstallError::AlreadySeeded));

    let first = global::resources().expect("resolve");
    assert_eq!(global::get("Api.url").expect("api").as_str(), Some("https://env.example"));
    assert_eq!(global::get("Cache.host").expect("cache").as_str(), Some("localhost"));
    assert_eq!(first.source_of("Cache"), Some(Source::InjectedLinks));

    // Later environment changes are not observed.
    std::env::set_var("SST_RESOURCE_Late", r#"{"x":1}"#);
    let second = global::resources().expect("cached");
    assert!(std::ptr::eq(first, second));
    assert!(matches!(
        global::get("Late"),
        Err(ResourceError::Unlinked { ref name, .. }) if name == "Late"
    ));

    assert_eq!(
        global::inject_key_file_data(serde_json::Map::new()),
        Err(InstallError::AlreadyResolved)
    );
    let replacement = Resources::from_env().expect("explicit load");
    assert!(global::install(replacement).is_err());
}
