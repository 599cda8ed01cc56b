use parlor_types::models::Role;

/// Conversation operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    UpdateSettings,
    DeleteConversation,
    ManageRoles,
    AddParticipants,
    RemoveParticipants,
    PinMessages,
    DeleteAnyMessage,
    MentionEveryone,
    PostInReadOnly,
    CloseAnyPoll,
}

/// Whether `role` may perform `action` at all. Rank constraints between
/// actor and target (e.g. admins only touching members) are checked by the
/// operation itself.
pub fn allows(role: Role, action: Action) -> bool {
    use Action::*;
    use Role::*;

    match action {
        DeleteConversation => role == Owner,
        UpdateSettings | ManageRoles | AddParticipants | PinMessages | MentionEveryone
        | PostInReadOnly | CloseAnyPoll => matches!(role, Owner | Admin),
        RemoveParticipants | DeleteAnyMessage => matches!(role, Owner | Admin | Moderator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [Role; 4] = [Role::Owner, Role::Admin, Role::Moderator, Role::Member];

    fn permitted(action: Action) -> Vec<Role> {
        ALL_ROLES.into_iter().filter(|r| allows(*r, action)).collect()
    }

    #[test]
    fn only_owner_deletes_conversation() {
        assert_eq!(permitted(Action::DeleteConversation), vec![Role::Owner]);
    }

    #[test]
    fn moderators_may_delete_messages_but_not_pin() {
        assert!(allows(Role::Moderator, Action::DeleteAnyMessage));
        assert!(allows(Role::Moderator, Action::RemoveParticipants));
        assert!(!allows(Role::Moderator, Action::PinMessages));
        assert!(!allows(Role::Moderator, Action::ManageRoles));
    }

    #[test]
    fn members_hold_no_elevated_action() {
        for action in [
            Action::UpdateSettings,
            Action::DeleteConversation,
            Action::ManageRoles,
            Action::AddParticipants,
            Action::RemoveParticipants,
            Action::PinMessages,
            Action::DeleteAnyMessage,
            Action::MentionEveryone,
            Action::PostInReadOnly,
            Action::CloseAnyPoll,
        ] {
            assert!(!allows(Role::Member, action), "{:?}", action);
        }
    }

    #[test]
    fn admin_and_owner_share_management_actions() {
        for action in [Action::ManageRoles, Action::PinMessages, Action::PostInReadOnly] {
            assert_eq!(permitted(action), vec![Role::Owner, Role::Admin]);
        }
    }
}
