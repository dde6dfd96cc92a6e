use serde_json::json;
use warden_acl::*;

fn main() -> Result<(), Error> {
    env_logger::init();

    let mut acl = Acl::new();

    acl.add_role("guests", &[])?;
    acl.add_role("users", &["guests"])?;
    acl.add_role("moderators", &["users"])?;

    acl.add_resource("articles", &["read", "edit", "publish"])?;
    acl.add_resource("comments", &["read", "post", "remove"])?;

    // anyone registered so far may read articles and comments
    acl.allow("*", "articles", &["read"], None)?;
    acl.allow("*", "comments", &["read"], None)?;

    // guests must not edit or publish anything
    acl.deny("guests", "articles", &["edit", "publish"], None)?;

    // users may post comments and edit their own articles
    acl.allow("users", "comments", &["post"], None)?;
    acl.allow("users", "articles", &["edit"], Some(Predicate::new(|_role, _resource, params| {
        params
            .and_then(|map| map.get("owner"))
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    })))?;

    // moderators may do anything on comments
    acl.allow("moderators", "comments", &["*"], None)?;

    assert!( acl.is_allowed("guests", "articles", "read", None));
    assert!(!acl.is_allowed("guests", "articles", "edit", None));

    let mut own = Params::new();

    own.insert(String::from("owner"), json!(true));

    assert!( acl.is_allowed("users", "articles", "edit", Some(&own)));
    assert!(!acl.is_allowed("users", "articles", "edit", None));
    assert!( acl.is_allowed("moderators", "comments", "remove", None));

    // unknown roles fall back to the default action
    assert_eq!(acl.get_default_action(), Access::Deny);
    assert!(!acl.is_allowed("strangers", "articles", "read", None));

    Ok(())
} // main
