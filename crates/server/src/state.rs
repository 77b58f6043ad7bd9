use reminder_core::Config;

use crate::service::AlarmService;

pub struct AppState {
    pub config: Config,
    pub alarms: AlarmService,
}
