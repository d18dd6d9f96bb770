use sweetshop_core::UserId;

/// Identity of the caller, as asserted by the upstream identity collaborator.
///
/// Present on every `/api/cart` request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
