//! Provision command handler: the two-step PolicyKey handshake (§4.6).
//!
//! Phase 1: device has no PolicyKey (or sends `"0"`) — server replies with
//! `PolicyKey="0"` and the full `EASProvisionDoc`. Phase 2: device
//! acknowledges with PolicyKey `"0"` — server assigns the real key and
//! marks the device provisioned.

use eas_core::wbxml::tokens::{codepage, provision};
use eas_core::wbxml::WbxmlWriter;
use eas_db::repository::device::DeviceRepository;

use crate::error::SyncResult;

/// WBXML Status codes this handler can produce.
pub mod status {
    pub const SUCCESS: u8 = 1;
}

/// The fixed policy key assigned once Phase 2 completes. Not a secret: the
/// protocol only uses it to detect a stale client-side policy cache.
pub const PROVISIONED_POLICY_KEY: &str = "1234567890";

pub struct ProvisionOutcome {
    pub status: u8,
    pub policy_key: String,
}

/// Handles one Provision request, writing the full `<Policies><Policy>
/// ...</Policy></Policies>` block. The caller writes the enclosing
/// `<Provision><Status>` wrapper around this, using the returned status.
///
/// `client_policy_key` is `None` when the request carried no `<PolicyKey>`
/// at all.
pub async fn handle_provision(
    w: &mut WbxmlWriter,
    devices: &DeviceRepository,
    user_id: &str,
    device_id: &str,
    device_type: &str,
    client_policy_key: Option<&str>,
) -> SyncResult<ProvisionOutcome> {
    devices.load_or_create(user_id, device_id, device_type).await?;

    let policy_key = if client_policy_key == Some("0") {
        devices
            .mark_provisioned(user_id, device_id, PROVISIONED_POLICY_KEY)
            .await?;
        PROVISIONED_POLICY_KEY.to_string()
    } else {
        "0".to_string()
    };

    w.page(codepage::PROVISION);
    w.start(provision::POLICIES, true);
    w.start(provision::POLICY, true);
    w.write_text_element(provision::POLICY_TYPE, "MS-EAS-Provisioning-WBXML");
    w.write_text_element(provision::STATUS, "1");
    w.write_text_element(provision::POLICY_KEY, &policy_key);
    if client_policy_key != Some("0") {
        w.start(provision::DATA, true);
        write_provision_doc(w);
        w.end(); // Data
    }
    w.end(); // Policy
    w.end(); // Policies

    Ok(ProvisionOutcome {
        status: status::SUCCESS,
        policy_key,
    })
}

/// Writes the static `EASProvisionDoc` (§6): a fixed, permissive policy.
/// Field values are chosen to impose no real restriction on the device,
/// since this gateway has no MDM backing store to source real policy from.
fn write_provision_doc(w: &mut WbxmlWriter) {
    w.page(codepage::PROVISION);
    w.start(provision::EAS_PROVISION_DOC, true);

    write_bool(w, provision::DEVICE_PASSWORD_ENABLED, false);
    write_bool(w, provision::ALPHANUMERIC_DEVICE_PASSWORD_REQUIRED, false);
    write_bool(w, provision::PASSWORD_RECOVERY_ENABLED, false);
    write_bool(w, provision::ATTACHMENTS_ENABLED, true);
    w.write_text_element(provision::MIN_DEVICE_PASSWORD_LENGTH, "0");
    w.write_text_element(provision::MAX_INACTIVITY_TIME_DEVICE_LOCK, "0");
    w.write_text_element(provision::MAX_DEVICE_PASSWORD_FAILED_ATTEMPTS, "0");
    w.write_text_element(provision::MAX_ATTACHMENT_SIZE, "52428800");
    write_bool(w, provision::ALLOW_SIMPLE_DEVICE_PASSWORD, true);
    w.write_text_element(provision::DEVICE_PASSWORD_EXPIRATION, "0");
    w.write_text_element(provision::DEVICE_PASSWORD_HISTORY, "0");
    write_bool(w, provision::ALLOW_STORAGE_CARD, true);
    write_bool(w, provision::ALLOW_CAMERA, true);
    write_bool(w, provision::REQUIRE_DEVICE_ENCRYPTION, false);
    write_bool(w, provision::ALLOW_UNSIGNED_APPLICATIONS, true);
    write_bool(w, provision::ALLOW_UNSIGNED_INSTALLATION_PACKAGES, true);
    w.write_text_element(provision::MIN_DEVICE_PASSWORD_COMPLEX_CHARACTERS, "0");
    write_bool(w, provision::ALLOW_WIFI, true);
    write_bool(w, provision::ALLOW_TEXT_MESSAGING, true);
    write_bool(w, provision::ALLOW_POPIMAP_EMAIL, true);
    // Not boolean: 0=disabled, 1=allowed, 2=hands-free profile only.
    w.write_text_element(provision::ALLOW_BLUETOOTH, "2");
    write_bool(w, provision::ALLOW_IRDA, true);
    write_bool(w, provision::REQUIRE_MANUAL_SYNC_WHEN_ROAMING, false);
    write_bool(w, provision::ALLOW_DESKTOP_SYNC, true);
    w.write_text_element(provision::MAX_CALENDAR_AGE_FILTER, "0");
    write_bool(w, provision::ALLOW_HTML_EMAIL, true);
    w.write_text_element(provision::MAX_EMAIL_AGE_FILTER, "0");
    w.write_text_element(provision::MAX_EMAIL_BODY_TRUNCATION_SIZE, "-1");
    w.write_text_element(provision::MAX_EMAIL_HTML_BODY_TRUNCATION_SIZE, "-1");
    write_bool(w, provision::REQUIRE_SIGNED_SMIME_MESSAGES, false);
    write_bool(w, provision::REQUIRE_ENCRYPTED_SMIME_MESSAGES, false);
    write_bool(w, provision::REQUIRE_SIGNED_SMIME_ALGORITHM, false);
    write_bool(w, provision::REQUIRE_ENCRYPTION_SMIME_ALGORITHM, false);
    // Not boolean: 0=required, 1=optional, 2=allowed (client may negotiate).
    w.write_text_element(provision::ALLOW_SMIME_ENCRYPTION_ALGORITHM_NEGOTIATION, "2");
    write_bool(w, provision::ALLOW_SMIME_SOFT_CERTS, true);
    write_bool(w, provision::ALLOW_BROWSER, true);
    write_bool(w, provision::ALLOW_CONSUMER_EMAIL, true);
    write_bool(w, provision::ALLOW_REMOTE_DESKTOP, true);
    write_bool(w, provision::ALLOW_INTERNET_SHARING, true);

    w.end(); // EASProvisionDoc
}

fn write_bool(w: &mut WbxmlWriter, tok: u8, value: bool) {
    w.write_text_element(tok, if value { "1" } else { "0" });
}
