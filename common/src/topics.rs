pub const TOPIC_RADIO_REQUEST: &str = "examtimer/radio/request";
pub const TOPIC_RADIO_STATUS: &str = "examtimer/radio/status";

pub const TOPIC_CLIENT_STATUS: &str = "examtimer/client/status";
