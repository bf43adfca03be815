//! Read-only transition applied after a successful submission.

use super::page::{AgreementPage, ControlKind, SignatureSlot};

pub const LOCK_BANNER: &str =
    "Form submitted and locked. Your information is displayed in read-only mode.";

impl AgreementPage {
    pub fn is_locked(&self) -> bool {
        self.banner.is_some()
    }

    /// Make every control read-only, freeze the signature pad and insert the banner.
    /// Returns `false` when the page was already locked; nothing changes then.
    pub fn lock(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }

        for control in &mut self.controls {
            match control.kind {
                ControlKind::Select => control.disabled = true,
                ControlKind::Text | ControlKind::Checkbox | ControlKind::Hidden => {
                    control.read_only = true
                }
            }
            control.dimmed = true;
        }

        let slot = std::mem::replace(&mut self.signature, SignatureSlot::Detached);
        self.signature = match slot {
            SignatureSlot::Live(pad) => SignatureSlot::Locked(pad.lock()),
            other => other,
        };

        self.pad_buttons_disabled = true;
        self.submit.disabled = true;
        self.submit.visible = false;
        self.banner = Some(LOCK_BANNER.to_string());
        log::info!("Agreement form locked");
        true
    }
}
