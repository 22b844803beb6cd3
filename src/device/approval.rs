/// On-device user confirmation.
///
/// The device asks before releasing its recipient key or a shared secret.
pub trait Approver {
    fn approve(&mut self, prompt: &str) -> bool;
}

/// Approves every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Approver for AutoApprove {
    fn approve(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Rejects every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl Approver for DenyAll {
    fn approve(&mut self, _prompt: &str) -> bool {
        false
    }
}

impl<A: Approver + ?Sized> Approver for Box<A> {
    fn approve(&mut self, prompt: &str) -> bool {
        (**self).approve(prompt)
    }
}
