use crate::models::{truncate_chars, Tags};
use serde_json::Value;

/// Name of a context tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ContextTagKey(&'static str);

impl ContextTagKey {
    const fn new(key: &'static str) -> Self {
        ContextTagKey(key)
    }

    pub(crate) fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Unique client device id. Computer name in most cases.
pub(crate) const DEVICE_ID: ContextTagKey = ContextTagKey::new("ai.device.id");

/// The IP address of the client device.
pub(crate) const DEVICE_IP: ContextTagKey = ContextTagKey::new("ai.device.ip");

/// Language of the browser, e.g. 'en-US'.
pub(crate) const DEVICE_LANGUAGE: ContextTagKey = ContextTagKey::new("ai.device.language");

/// Operating system of the device the end user of the application is using.
pub(crate) const DEVICE_OS: ContextTagKey = ContextTagKey::new("ai.device.os");

/// The type of the device the end user of the application is using. Used primarily to distinguish
/// JavaScript telemetry from server side telemetry. Examples: 'PC', 'Phone', 'Browser'.
pub(crate) const DEVICE_TYPE: ContextTagKey = ContextTagKey::new("ai.device.type");

/// Name of the browser.
pub(crate) const DEVICE_BROWSER: ContextTagKey = ContextTagKey::new("ai.device.browser");

/// Version of the browser.
pub(crate) const DEVICE_BROWSER_VERSION: ContextTagKey =
    ContextTagKey::new("ai.device.browserVersion");

/// A unique identifier for the operation instance. The operation.id is created by either a request
/// or a page view. All other telemetry sets this to the value for the containing request or page
/// view.
pub(crate) const OPERATION_ID: ContextTagKey = ContextTagKey::new("ai.operation.id");

/// The name (group) of the operation.
pub(crate) const OPERATION_NAME: ContextTagKey = ContextTagKey::new("ai.operation.name");

/// The unique identifier of the telemetry item's immediate parent.
pub(crate) const OPERATION_PARENT_ID: ContextTagKey = ContextTagKey::new("ai.operation.parentId");

/// Session ID - the instance of the user's interaction with the app.
pub(crate) const SESSION_ID: ContextTagKey = ContextTagKey::new("ai.session.id");

/// Anonymous user id. Represents the end user of the application.
pub(crate) const USER_ID: ContextTagKey = ContextTagKey::new("ai.user.id");

/// Authenticated user id. The opposite of ai.user.id, this represents the user with a friendly
/// name.
pub(crate) const USER_AUTH_USER_ID: ContextTagKey = ContextTagKey::new("ai.user.authUserId");

/// SDK version.
pub(crate) const INTERNAL_SDK_VERSION: ContextTagKey = ContextTagKey::new("ai.internal.sdkVersion");

/// Every tag the ingestion service knows, with the maximum length of its value.
const KNOWN_TAGS: [(&str, usize); 57] = [
    ("ai.application.ver", 1024),
    ("ai.application.build", 1024),
    ("ai.application.typeId", 1024),
    ("ai.application.applicationId", 1024),
    ("ai.application.layer", 1024),
    ("ai.device.id", 1024),
    ("ai.device.ip", 46),
    ("ai.device.language", 64),
    ("ai.device.locale", 64),
    ("ai.device.model", 256),
    ("ai.device.friendlyName", 256),
    ("ai.device.network", 256),
    ("ai.device.networkName", 256),
    ("ai.device.oemName", 256),
    ("ai.device.os", 256),
    ("ai.device.osVersion", 256),
    ("ai.device.roleInstance", 256),
    ("ai.device.roleName", 256),
    ("ai.device.screenResolution", 64),
    ("ai.device.type", 64),
    ("ai.device.machineName", 256),
    ("ai.device.vmName", 256),
    ("ai.device.browser", 256),
    ("ai.device.browserVersion", 256),
    ("ai.location.ip", 46),
    ("ai.location.country", 256),
    ("ai.location.province", 256),
    ("ai.location.city", 256),
    ("ai.operation.id", 128),
    ("ai.operation.name", 1024),
    ("ai.operation.parentId", 128),
    ("ai.operation.rootId", 128),
    ("ai.operation.syntheticSource", 1024),
    ("ai.operation.correlationVector", 64),
    ("ai.session.id", 64),
    ("ai.session.isFirst", 5),
    ("ai.session.isNew", 5),
    ("ai.user.accountAcquisitionDate", 64),
    ("ai.user.accountId", 1024),
    ("ai.user.userAgent", 1024),
    ("ai.user.id", 128),
    ("ai.user.storeRegion", 64),
    ("ai.user.authUserId", 1024),
    ("ai.user.anonUserAcquisitionDate", 64),
    ("ai.user.authUserAcquisitionDate", 64),
    ("ai.cloud.name", 256),
    ("ai.cloud.role", 256),
    ("ai.cloud.roleVer", 256),
    ("ai.cloud.roleInstance", 256),
    ("ai.cloud.environment", 256),
    ("ai.cloud.location", 256),
    ("ai.cloud.deploymentUnit", 256),
    ("ai.internal.nodeName", 256),
    ("ai.internal.sdkVersion", 64),
    ("ai.internal.agentVersion", 64),
    ("ai.internal.snippet", 64),
    ("ai.internal.sdkSrc", 64),
];

/// Maximum value length of a known tag. `None` for unknown tags.
pub(crate) fn max_length(key: &str) -> Option<usize> {
    KNOWN_TAGS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, max)| *max)
}

pub(crate) trait Sanitize {
    fn sanitize(&mut self);
}

impl Sanitize for Tags {
    /// Drop unknown tags and cap the values of known ones.
    fn sanitize(&mut self) {
        let tags = std::mem::take(self);
        for (key, value) in tags {
            let Some(max) = max_length(&key) else {
                continue;
            };
            let value = match value {
                Value::String(s) => Value::String(truncate_chars(&s, max).to_string()),
                Value::Null => continue,
                other => Value::String(truncate_chars(&other.to_string(), max).to_string()),
            };
            self.insert(key, value);
        }
    }
}
