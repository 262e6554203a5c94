//! Settings command handler (§10.6).
//!
//! No per-device settings are persisted in this revision: every request
//! gets the same static acknowledgement document regardless of what `<Get>`
//! or `<Set>` blocks the client sent.

use eas_core::wbxml::tokens::{codepage, settings};
use eas_core::wbxml::WbxmlWriter;

pub mod status {
    pub const SUCCESS: u8 = 1;
}

/// Writes `<Settings><Status>1</Status><DeviceInformation><Status>1</Status>
/// </DeviceInformation></Settings>`. The caller supplies the outer
/// `<Settings>` start/end; this writes what goes between them.
pub fn write_settings_response(w: &mut WbxmlWriter) {
    w.page(codepage::SETTINGS);
    w.write_text_element(settings::STATUS, "1");
    w.start(settings::DEVICE_INFORMATION, true);
    w.write_text_element(settings::STATUS, "1");
    w.end();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_settings_response_is_well_formed() {
        let mut w = WbxmlWriter::new();
        w.header();
        w.page(codepage::SETTINGS);
        w.start(settings::SETTINGS, true);
        write_settings_response(&mut w);
        w.end();
        assert!(!w.bytes().is_empty());
    }
}
