use poem_openapi::Object;

use crate::services::session_registry::SessionView;

/// One signed-in device, as shown on the sessions screen
#[derive(Object, Debug)]
pub struct SessionItem {
    pub id: String,
    /// Device class: Desktop, Phone, Tablet, iPhone, iPad or Unknown
    pub device: String,
    pub platform: String,
    pub browser: String,
    pub ip_address: Option<String>,
    pub last_activity: i64,
    /// Whether this row is the session making the request
    pub is_current: bool,
}

impl From<SessionView> for SessionItem {
    fn from(view: SessionView) -> Self {
        Self {
            id: view.session.id,
            device: view.device.device,
            platform: view.device.platform,
            browser: view.device.browser,
            ip_address: view.session.ip_address,
            last_activity: view.session.last_activity,
            is_current: view.is_current,
        }
    }
}

#[derive(Object, Debug)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionItem>,
}

/// Request body for terminating every other session
#[derive(Object, Debug)]
pub struct TerminateOthersRequest {
    /// Account password, re-confirmed for this destructive action
    pub password: String,
}

#[derive(Object, Debug)]
pub struct TerminateOthersResponse {
    pub terminated_count: u64,
}
