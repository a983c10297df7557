//! The four-screen view router.

use crate::types::Role;

/// Which screen is showing. Starts at `Login`; the only legal moves are
/// login <-> signup, login -> admin/user (on auth, branched by role) and
/// admin/user -> login (on logout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Login,
    Signup,
    Admin,
    User,
}

impl View {
    pub fn can_transition(self, to: View) -> bool {
        use View::*;
        matches!(
            (self, to),
            (Login, Signup) | (Login, Admin) | (Login, User) | (Signup, Login) | (Admin, Login) | (User, Login)
        )
    }
}

/// Which dashboard a fresh auth grant lands on.
pub fn initial_view_for(roles: &[Role]) -> View {
    if roles.contains(&Role::Admin) {
        View::Admin
    } else {
        View::User
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_matrix() {
        use View::*;
        let all = [Login, Signup, Admin, User];

        for to in all {
            assert_eq!(Login.can_transition(to), to != Login);
        }
        for from in [Signup, Admin, User] {
            for to in all {
                assert_eq!(from.can_transition(to), to == Login);
            }
        }
    }

    #[test]
    fn test_initial_view_branches_on_role() {
        assert_eq!(initial_view_for(&[Role::Admin, Role::User]), View::Admin);
        assert_eq!(initial_view_for(&[Role::User]), View::User);
        assert_eq!(initial_view_for(&[Role::Other("ROLE_X".into())]), View::User);
        assert_eq!(initial_view_for(&[]), View::User);
    }

    #[test]
    fn test_default_is_login() {
        assert_eq!(View::default(), View::Login);
    }
}
