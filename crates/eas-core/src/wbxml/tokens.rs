//! WBXML codepage and tag token tables.
//!
//! Values are the *base* token (no content bit set); [`crate::wbxml::writer::WbxmlWriter::start`]
//! sets bit 0x40 itself when the element carries content. Token numbering follows
//! the codepages defined by MS-ASWBXML for protocol versions 12.1-16.1.

/// Global WBXML control tokens, valid in any codepage.
pub mod control {
    pub const SWITCH_PAGE: u8 = 0x00;
    pub const END: u8 = 0x01;
    pub const STR_I: u8 = 0x03;
    pub const OPAQUE: u8 = 0xC3;
}

/// Codepage indices (the byte that follows SWITCH_PAGE).
pub mod codepage {
    pub const AIRSYNC: u8 = 0;
    pub const PING: u8 = 1;
    pub const EMAIL: u8 = 2;
    pub const FOLDER_HIERARCHY: u8 = 7;
    pub const PROVISION: u8 = 14;
    pub const SEARCH: u8 = 15;
    pub const AIRSYNCBASE: u8 = 17;
    pub const ITEM_OPERATIONS: u8 = 23;
    pub const SETTINGS: u8 = 18;
}

/// AirSync (codepage 0): Sync command and collection structure.
pub mod airsync {
    pub const SYNC: u8 = 0x05;
    pub const RESPONSES: u8 = 0x06;
    pub const ADD: u8 = 0x07;
    pub const CHANGE: u8 = 0x08;
    pub const DELETE: u8 = 0x09;
    pub const FETCH: u8 = 0x0A;
    pub const SYNC_KEY: u8 = 0x0B;
    pub const CLIENT_ID: u8 = 0x0C;
    pub const SERVER_ID: u8 = 0x0D;
    pub const STATUS: u8 = 0x0E;
    pub const COLLECTION: u8 = 0x0F;
    pub const CLASS: u8 = 0x10;
    pub const COLLECTION_ID: u8 = 0x12;
    pub const GET_CHANGES: u8 = 0x13;
    pub const MORE_AVAILABLE: u8 = 0x14;
    pub const WINDOW_SIZE: u8 = 0x15;
    pub const COMMANDS: u8 = 0x16;
    pub const COLLECTIONS: u8 = 0x1C;
    pub const APPLICATION_DATA: u8 = 0x1D;
}

/// Ping (codepage 1): long-poll heartbeat.
pub mod ping {
    pub const PING: u8 = 0x05;
    pub const AUTD_STATE: u8 = 0x06;
    pub const STATUS: u8 = 0x08;
    pub const HEARTBEAT_INTERVAL: u8 = 0x03;
    pub const FOLDERS: u8 = 0x04;
    pub const FOLDER: u8 = 0x02;
    pub const SERVER_ENTRY_ID: u8 = 0x0A;
}

/// Email (codepage 2): mail item properties.
pub mod email {
    pub const DATE_RECEIVED: u8 = 0x0F;
    pub const MESSAGE_CLASS: u8 = 0x13;
    pub const SUBJECT: u8 = 0x14;
    pub const READ: u8 = 0x15;
    pub const TO: u8 = 0x16;
    pub const FROM: u8 = 0x18;
    pub const INTERNET_CPID: u8 = 0x39;
}

/// FolderHierarchy (codepage 7): the fixed folder tree.
pub mod folder_hierarchy {
    pub const DISPLAY_NAME: u8 = 0x07;
    pub const SERVER_ID: u8 = 0x08;
    pub const PARENT_ID: u8 = 0x09;
    pub const TYPE: u8 = 0x0A;
    pub const STATUS: u8 = 0x0C;
    pub const CHANGES: u8 = 0x0E;
    pub const ADD: u8 = 0x0F;
    pub const FOLDER_SYNC: u8 = 0x16;
    pub const SYNC_KEY: u8 = 0x12;
    pub const COUNT: u8 = 0x17;
}

/// Provision (codepage 14): device policy handshake.
pub mod provision {
    pub const PROVISION: u8 = 0x05;
    pub const POLICIES: u8 = 0x06;
    pub const POLICY: u8 = 0x07;
    pub const POLICY_TYPE: u8 = 0x08;
    pub const POLICY_KEY: u8 = 0x09;
    pub const DATA: u8 = 0x0A;
    pub const STATUS: u8 = 0x0B;
    pub const REMOTE_WIPE: u8 = 0x0C;
    pub const EAS_PROVISION_DOC: u8 = 0x0D;
    pub const DEVICE_PASSWORD_ENABLED: u8 = 0x0E;
    pub const ALPHANUMERIC_DEVICE_PASSWORD_REQUIRED: u8 = 0x0F;
    pub const PASSWORD_RECOVERY_ENABLED: u8 = 0x11;
    pub const ATTACHMENTS_ENABLED: u8 = 0x13;
    pub const MIN_DEVICE_PASSWORD_LENGTH: u8 = 0x14;
    pub const MAX_INACTIVITY_TIME_DEVICE_LOCK: u8 = 0x15;
    pub const MAX_DEVICE_PASSWORD_FAILED_ATTEMPTS: u8 = 0x16;
    pub const MAX_ATTACHMENT_SIZE: u8 = 0x17;
    pub const ALLOW_SIMPLE_DEVICE_PASSWORD: u8 = 0x18;
    pub const DEVICE_PASSWORD_EXPIRATION: u8 = 0x19;
    pub const DEVICE_PASSWORD_HISTORY: u8 = 0x1A;
    pub const ALLOW_STORAGE_CARD: u8 = 0x1B;
    pub const ALLOW_CAMERA: u8 = 0x1C;
    pub const REQUIRE_DEVICE_ENCRYPTION: u8 = 0x1D;
    pub const ALLOW_UNSIGNED_APPLICATIONS: u8 = 0x1E;
    pub const ALLOW_UNSIGNED_INSTALLATION_PACKAGES: u8 = 0x1F;
    pub const MIN_DEVICE_PASSWORD_COMPLEX_CHARACTERS: u8 = 0x20;
    pub const ALLOW_WIFI: u8 = 0x21;
    pub const ALLOW_TEXT_MESSAGING: u8 = 0x22;
    pub const ALLOW_POPIMAP_EMAIL: u8 = 0x23;
    pub const ALLOW_BLUETOOTH: u8 = 0x24;
    pub const ALLOW_IRDA: u8 = 0x25;
    pub const REQUIRE_MANUAL_SYNC_WHEN_ROAMING: u8 = 0x26;
    pub const ALLOW_DESKTOP_SYNC: u8 = 0x27;
    pub const MAX_CALENDAR_AGE_FILTER: u8 = 0x28;
    pub const ALLOW_HTML_EMAIL: u8 = 0x29;
    pub const MAX_EMAIL_AGE_FILTER: u8 = 0x2A;
    pub const MAX_EMAIL_BODY_TRUNCATION_SIZE: u8 = 0x2B;
    pub const MAX_EMAIL_HTML_BODY_TRUNCATION_SIZE: u8 = 0x2C;
    pub const REQUIRE_SIGNED_SMIME_MESSAGES: u8 = 0x2D;
    pub const REQUIRE_ENCRYPTED_SMIME_MESSAGES: u8 = 0x2E;
    pub const REQUIRE_SIGNED_SMIME_ALGORITHM: u8 = 0x2F;
    pub const REQUIRE_ENCRYPTION_SMIME_ALGORITHM: u8 = 0x30;
    pub const ALLOW_SMIME_ENCRYPTION_ALGORITHM_NEGOTIATION: u8 = 0x31;
    pub const ALLOW_SMIME_SOFT_CERTS: u8 = 0x32;
    pub const ALLOW_BROWSER: u8 = 0x33;
    pub const ALLOW_CONSUMER_EMAIL: u8 = 0x34;
    pub const ALLOW_REMOTE_DESKTOP: u8 = 0x35;
    pub const ALLOW_INTERNET_SHARING: u8 = 0x36;
}

/// Search (codepage 15): best-effort GAL lookup.
pub mod search {
    pub const SEARCH: u8 = 0x05;
    pub const STATUS: u8 = 0x06;
    pub const RESPONSE: u8 = 0x07;
    pub const STORE: u8 = 0x08;
    pub const QUERY: u8 = 0x0A;
    pub const RESULT: u8 = 0x0B;
    pub const PROPERTIES: u8 = 0x0C;
    pub const DISPLAY_NAME: u8 = 0x11;
    pub const EMAIL_ADDRESS: u8 = 0x12;
}

/// AirSyncBase (codepage 17): the Body Pipeline's wire shape.
pub mod airsyncbase {
    pub const BODY_PREFERENCE: u8 = 0x05;
    pub const TYPE: u8 = 0x06;
    pub const TRUNCATION_SIZE: u8 = 0x07;
    pub const ALL_OR_NONE: u8 = 0x08;
    pub const BODY: u8 = 0x0A;
    pub const DATA: u8 = 0x0B;
    pub const ESTIMATED_DATA_SIZE: u8 = 0x0C;
    pub const TRUNCATED: u8 = 0x0D;
    pub const ATTACHMENTS: u8 = 0x0E;
    pub const ATTACHMENT: u8 = 0x0F;
    pub const CONTENT_TYPE: u8 = 0x12;
    pub const BODY_PART: u8 = 0x15;
    pub const NATIVE_BODY_TYPE: u8 = 0x16;
}

/// ItemOperations (codepage 23): Fetch command.
pub mod item_operations {
    pub const ITEM_OPERATIONS: u8 = 0x05;
    pub const FETCH: u8 = 0x06;
    pub const STORE: u8 = 0x07;
    pub const OPTIONS: u8 = 0x08;
    pub const STATUS: u8 = 0x09;
    pub const RESPONSE: u8 = 0x0A;
    pub const COLLECTION_ID: u8 = 0x0C;
    pub const SERVER_ID: u8 = 0x0E;
    pub const DATA: u8 = 0x11;
}

/// Settings (codepage 18): static device-info acknowledgement document.
pub mod settings {
    pub const SETTINGS: u8 = 0x05;
    pub const STATUS: u8 = 0x06;
    pub const GET: u8 = 0x07;
    pub const SET: u8 = 0x08;
    pub const OOF: u8 = 0x09;
    pub const OOF_STATE: u8 = 0x0A;
    pub const DEVICE_INFORMATION: u8 = 0x0D;
    pub const MODEL: u8 = 0x0E;
    pub const USER_AGENT: u8 = 0x0F;
}
