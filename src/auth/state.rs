//! Authentication state trait and macro.

use crate::session::SessionService;

/// Trait for router state types that back the auth extractors.
pub trait HasAuthState {
    fn sessions(&self) -> &SessionService;
}

/// Implement `HasAuthState` for a state struct with a `sessions` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub sessions: SessionService,
///     // ... other fields
/// }
///
/// impl_has_auth_state!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn sessions(&self) -> &$crate::session::SessionService {
                &self.sessions
            }
        }
    };
}
