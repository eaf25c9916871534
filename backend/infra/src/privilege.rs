use sshpair_core::PrivilegeProbe;

/// Root check via the effective uid.
#[derive(Debug, Default, Clone, Copy)]
pub struct EffectiveUid;

impl PrivilegeProbe for EffectiveUid {
    #[cfg(unix)]
    fn is_privileged(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(unix))]
    fn is_privileged(&self) -> bool {
        false
    }
}
