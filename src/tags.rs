use crate::{
    models::{
        context_tag_keys::{self as tags, ContextTagKey, Sanitize},
        Properties, Tags,
    },
    telemetry_item::{Extensions, TelemetryItem},
};
use serde_json::Value;

/// Version reported in `ai.internal.sdkVersion` unless the item sets one.
pub(crate) fn sdk_version() -> String {
    format!("rust:{}", env!("CARGO_PKG_VERSION"))
}

/// Context tags of an item: its structured context first, then the tag maps of the item.
/// Unknown tags are dropped and values are capped. Parts of the browser context that have
/// no tag go into `properties`.
pub(crate) fn get_tags_for_item(item: &TelemetryItem, properties: &mut Properties) -> Tags {
    let mut tags = get_tags_from_ext(&item.ext, properties);
    merge_item_tags(&mut tags, &item.tags);
    if !tags.contains_key(tags::INTERNAL_SDK_VERSION.as_str()) {
        insert(&mut tags, tags::INTERNAL_SDK_VERSION, Some(&sdk_version()));
    }
    tags.sanitize();
    tags
}

fn insert(tags: &mut Tags, key: ContextTagKey, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        tags.insert(key.as_str().into(), Value::String(value.clone()));
    }
}

fn get_tags_from_ext(ext: &Extensions, properties: &mut Properties) -> Tags {
    let mut tags = Tags::new();

    insert(&mut tags, tags::USER_AUTH_USER_ID, ext.user.auth_id.as_ref());
    insert(
        &mut tags,
        tags::USER_ID,
        ext.user.id.as_ref().or(ext.user.local_id.as_ref()),
    );

    insert(&mut tags, tags::SESSION_ID, ext.app.ses_id.as_ref());

    insert(
        &mut tags,
        tags::DEVICE_ID,
        ext.device.id.as_ref().or(ext.device.local_id.as_ref()),
    );
    insert(&mut tags, tags::DEVICE_TYPE, ext.device.device_class.as_ref());
    insert(&mut tags, tags::DEVICE_IP, ext.device.ip.as_ref());

    insert(&mut tags, tags::DEVICE_LANGUAGE, ext.web.browser_lang.as_ref());
    insert(&mut tags, tags::DEVICE_BROWSER_VERSION, ext.web.browser_ver.as_ref());
    insert(&mut tags, tags::DEVICE_BROWSER, ext.web.browser.as_ref());
    if let Some(domain) = &ext.web.domain {
        properties.insert("domain".into(), Value::String(domain.clone()));
    }
    if ext.web.is_manual == Some(true) {
        properties.insert("isManual".into(), Value::from("true"));
    }
    if let Some(screen_res) = &ext.web.screen_res {
        properties.insert("screenRes".into(), Value::String(screen_res.clone()));
    }
    if ext.web.user_consent == Some(true) {
        properties.insert("userConsent".into(), Value::from("true"));
    }

    insert(&mut tags, tags::DEVICE_OS, ext.os.name.as_ref());

    insert(&mut tags, tags::OPERATION_PARENT_ID, ext.trace.parent_id.as_ref());
    insert(&mut tags, tags::OPERATION_NAME, ext.trace.name.as_ref());
    insert(&mut tags, tags::OPERATION_ID, ext.trace.trace_id.as_ref());

    tags
}

/// Merge tag maps into `tags`. Earlier maps win over later ones, and all of them win over
/// tags taken from the structured context.
fn merge_item_tags(tags: &mut Tags, item_tags: &[serde_json::Map<String, Value>]) {
    let mut merged = Tags::new();
    for map in item_tags.iter().rev() {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    for (key, value) in merged {
        tags.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry_item::{DeviceExt, TraceExt, UserExt, WebExt};
    use serde_json::json;

    #[test]
    fn tags_from_ext() {
        let item = TelemetryItem::new("EventData").with_ext(Extensions {
            user: UserExt {
                local_id: Some("local".into()),
                auth_id: Some("auth".into()),
                ..Default::default()
            },
            device: DeviceExt {
                id: Some("device".into()),
                local_id: Some("ignored".into()),
                device_class: Some("Browser".into()),
                ..Default::default()
            },
            trace: TraceExt {
                trace_id: Some("trace".into()),
                parent_id: Some("parent".into()),
                name: Some("/index".into()),
            },
            web: WebExt {
                domain: Some("example.com".into()),
                is_manual: Some(false),
                user_consent: Some(true),
                ..Default::default()
            },
            ..Default::default()
        });
        let mut properties = Properties::new();
        let tags = get_tags_for_item(&item, &mut properties);
        assert_eq!(json!("local"), tags["ai.user.id"]);
        assert_eq!(json!("auth"), tags["ai.user.authUserId"]);
        assert_eq!(json!("device"), tags["ai.device.id"]);
        assert_eq!(json!("Browser"), tags["ai.device.type"]);
        assert_eq!(json!("trace"), tags["ai.operation.id"]);
        assert_eq!(json!("parent"), tags["ai.operation.parentId"]);
        assert_eq!(json!("/index"), tags["ai.operation.name"]);
        assert_eq!(json!(sdk_version()), tags["ai.internal.sdkVersion"]);
        assert_eq!(json!("example.com"), properties["domain"]);
        assert_eq!(json!("true"), properties["userConsent"]);
        assert!(!properties.contains_key("isManual"));
    }

    #[test]
    fn first_tag_map_wins_and_unknown_tags_are_dropped() {
        let mut first = serde_json::Map::new();
        first.insert("ai.user.id".into(), json!("first"));
        first.insert("custom.tag".into(), json!("x"));
        let mut second = serde_json::Map::new();
        second.insert("ai.user.id".into(), json!("second"));
        second.insert("ai.internal.sdkVersion".into(), json!("javascript:2.0.0"));
        let item = TelemetryItem::new("EventData")
            .with_ext(Extensions {
                user: UserExt {
                    id: Some("from-ext".into()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .with_tags(first)
            .with_tags(second);

        let tags = get_tags_for_item(&item, &mut Properties::new());
        assert_eq!(json!("first"), tags["ai.user.id"]);
        assert_eq!(json!("javascript:2.0.0"), tags["ai.internal.sdkVersion"]);
        assert!(!tags.contains_key("custom.tag"));
    }
}
