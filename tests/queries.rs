//! Query tests: roles in effect, role levels and manageable roles

use boardroles::*;
use tempfile::TempDir;

fn setup() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open_seeded(StoreConfig::new(dir.path()), Registry::with_defaults()).unwrap();
    (dir, store)
}

fn ids(roles: &[Role]) -> Vec<RoleId> {
    roles.iter().map(|r| r.id).collect()
}

// ============================================================================
// roles_for_user_and_board
// ============================================================================

#[test]
fn anonymous_visitor_gets_only_anonymous() {
    let (_dir, store) = setup();
    let roles = store.roles_for_user_and_board(None, Some("tech")).unwrap();
    assert_eq!(ids(&roles), vec![SystemRole::Anonymous.id()]);
}

#[test]
fn user_without_assignments_gets_anonymous() {
    let (_dir, store) = setup();
    let roles = store.roles_for_user_and_board(Some(77), None).unwrap();
    assert_eq!(ids(&roles), vec![SystemRole::Anonymous.id()]);
}

/// Global roles everywhere, board roles only on their board
#[test]
fn board_scoping_and_order() {
    let (_dir, store) = setup();
    let tech = store.create_role(RoleSpec::new("janitor", 45).board("tech")).unwrap();
    store.assign_role(5, SystemRole::Moderator.id()).unwrap();
    store.assign_role(5, SystemRole::Registered.id()).unwrap();
    store.assign_role(5, tech.id).unwrap();

    let on_tech = store.roles_for_user_and_board(Some(5), Some("tech")).unwrap();
    assert_eq!(ids(&on_tech), vec![3, tech.id, 7, 1]);

    let on_art = store.roles_for_user_and_board(Some(5), Some("art")).unwrap();
    assert_eq!(ids(&on_art), vec![3, 7, 1]);

    let site = store.roles_for_user_and_board(Some(5), None).unwrap();
    assert_eq!(ids(&site), vec![3, 7, 1]);
}

/// Explicitly assigned anonymous is not listed twice
#[test]
fn anonymous_is_not_duplicated() {
    let (_dir, store) = setup();
    store.assign_role(9, SystemRole::Anonymous.id()).unwrap();
    let roles = store.roles_for_user_and_board(Some(9), None).unwrap();
    assert_eq!(ids(&roles), vec![1]);
}

#[test]
fn compile_for_uses_effective_roles() {
    let (_dir, store) = setup();
    store.assign_role(5, SystemRole::Moderator.id()).unwrap();
    assert!(store.compile_for(Some(5), Some("tech")).unwrap().allows("board.post.sticky").unwrap());
    assert!(!store.compile_for(None, Some("tech")).unwrap().allows("board.post.sticky").unwrap());
    assert!(store.compile_for(None, None).unwrap().allows("board.post.create.thread").unwrap());
}

// ============================================================================
// role_level
// ============================================================================

#[test]
fn role_level_lists_direct_children() {
    let (_dir, store) = setup();
    let a = store
        .create_role(RoleSpec::new("janitor", 45).caste("x").inherit(SystemRole::Janitor.id()))
        .unwrap();
    let b = store
        .create_role(RoleSpec::new("janitor", 45).board("tech").inherit(SystemRole::Janitor.id()))
        .unwrap();
    let grandchild = store.create_role(RoleSpec::new("trainee", 41).inherit(a.id)).unwrap();

    let level = ids(&store.role_level(SystemRole::Janitor.id()).unwrap());
    assert_eq!(level[0], SystemRole::Janitor.id());
    assert!(level.contains(&a.id));
    assert!(level.contains(&b.id));
    assert!(!level.contains(&grandchild.id));
    assert_eq!(level.len(), 3);
}

#[test]
fn role_level_of_missing_role() {
    let (_dir, store) = setup();
    assert!(matches!(store.role_level(404), Err(Error::InvalidReference(_))));
}

// ============================================================================
// manageable_roles
// ============================================================================

/// Admin manages everything strictly below 100
#[test]
fn admin_manages_below_its_weight() {
    let (_dir, store) = setup();
    store.assign_role(1, SystemRole::Admin.id()).unwrap();
    let deputy = store.create_role(RoleSpec::new("deputy", 99)).unwrap();
    let tech = store.create_role(RoleSpec::new("janitor", 45).board("tech")).unwrap();

    let admin = Actor::Authenticated(1);
    let roles = store.manageable_roles(&admin, None).unwrap();
    let got = ids(&roles);
    assert!(got.contains(&deputy.id));
    assert!(got.contains(&tech.id));
    assert!(got.contains(&SystemRole::Moderator.id()));
    assert!(got.contains(&SystemRole::Anonymous.id()));
    assert!(!got.contains(&SystemRole::Admin.id()));
    assert!(!got.contains(&SystemRole::Absolute.id()));
    assert!(roles.iter().all(|r| r.weight < 100));
}

/// With a board, global authority covers global roles and that board's
#[test]
fn admin_scoped_to_board() {
    let (_dir, store) = setup();
    store.assign_role(1, SystemRole::Admin.id()).unwrap();
    let tech = store.create_role(RoleSpec::new("janitor", 45).board("tech")).unwrap();
    let art = store.create_role(RoleSpec::new("janitor", 45).board("art")).unwrap();

    let got = ids(&store.manageable_roles(&Actor::Authenticated(1), Some("tech")).unwrap());
    assert!(got.contains(&tech.id));
    assert!(got.contains(&SystemRole::Janitor.id()));
    assert!(!got.contains(&art.id));
}

/// A board owner manages only that board's roles below 60
#[test]
fn board_owner_manages_own_board_only() {
    let (_dir, store) = setup();
    let owner_role = store.get_or_create_board_owner_role("tech").unwrap();
    store.assign_role(2, owner_role.id).unwrap();
    let volunteer = store.create_role(RoleSpec::new("volunteer", 59).board("tech")).unwrap();
    let janitor = store.create_role(RoleSpec::new("janitor", 45).board("tech")).unwrap();
    store.create_role(RoleSpec::new("mod", 70).board("tech")).unwrap();
    store.create_role(RoleSpec::new("janitor", 45).board("art")).unwrap();

    let owner = Actor::Authenticated(2);
    assert_eq!(
        owner.authority(&store, Some("tech")).unwrap(),
        Authority { weight: 60, global: false }
    );
    let got = ids(&store.manageable_roles(&owner, Some("tech")).unwrap());
    assert_eq!(got, vec![volunteer.id, janitor.id]);

    assert!(store.manageable_roles(&owner, Some("art")).unwrap().is_empty());
    assert!(store.manageable_roles(&owner, None).unwrap().is_empty());
}

#[test]
fn plain_users_manage_nothing() {
    let (_dir, store) = setup();
    store.assign_role(3, SystemRole::Registered.id()).unwrap();
    assert!(store.manageable_roles(&Actor::Authenticated(3), None).unwrap().is_empty());
    assert!(store.manageable_roles(&Actor::Anonymous, Some("tech")).unwrap().is_empty());
}

/// Authority follows the mask, so a denied sys.config revokes it
#[test]
fn authority_tracks_overrides() {
    let (_dir, store) = setup();
    let sub = store.create_role(RoleSpec::new("subadmin", 90).inherit(SystemRole::Admin.id())).unwrap();
    store.assign_role(4, sub.id).unwrap();
    let actor = Actor::Authenticated(4);
    assert_eq!(actor.authority_weight(&store, None).unwrap(), 100);

    store.set_permission(sub.id, "sys.config", false).unwrap();
    assert_eq!(actor.authority_weight(&store, None).unwrap(), NO_AUTHORITY);
}
