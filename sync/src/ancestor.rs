use bevy::{
    ecs::query::{QueryData, QueryFilter},
    prelude::*,
};

/// Deepest hierarchy the ancestor walk will follow before giving up.
///
/// Real scenes are nowhere near this deep. Hitting it means the parent chain
/// loops back on itself.
pub const MAX_ANCESTOR_DEPTH: usize = 1024;

/// Find the nearest entity, starting with `entity` itself and then walking up
/// its parents, for which `has_body` holds.
///
/// `parent_of` is a non-owning parent lookup; the walk stops at the first
/// match or at the hierarchy root.
pub fn find_body_ancestor(
    entity: Entity,
    parent_of: impl Fn(Entity) -> Option<Entity>,
    has_body: impl Fn(Entity) -> bool,
) -> Option<Entity> {
    let mut current = entity;

    for _ in 0..MAX_ANCESTOR_DEPTH {
        if has_body(current) {
            return Some(current);
        }
        current = parent_of(current)?;
    }

    None
}

/// [`find_body_ancestor`] over the `ChildOf` hierarchy.
pub fn find_body_ancestor_in<D: QueryData, F: QueryFilter>(
    entity: Entity,
    parents: &Query<&ChildOf>,
    bodies: &Query<D, F>,
) -> Option<Entity> {
    find_body_ancestor(
        entity,
        |e| parents.get(e).ok().map(ChildOf::parent),
        |e| bodies.contains(e),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::{
        ecs::system::SystemState,
        platform::collections::{HashMap, HashSet},
    };

    fn spawn_many(world: &mut World, n: usize) -> Vec<Entity> {
        (0..n).map(|_| world.spawn_empty().id()).collect()
    }

    #[test]
    fn entity_itself_counts_as_ancestor() {
        let mut world = World::new();
        let e = spawn_many(&mut world, 1)[0];

        let found = find_body_ancestor(e, |_| None, |x| x == e);

        assert_eq!(found, Some(e));
    }

    #[test]
    fn returns_nearest_body_in_chain() {
        let mut world = World::new();
        let es = spawn_many(&mut world, 4);
        // es[3] -> es[2] -> es[1] -> es[0]
        let parents: HashMap<Entity, Entity> =
            [(es[3], es[2]), (es[2], es[1]), (es[1], es[0])].into_iter().collect();
        let bodies: HashSet<Entity> = [es[0], es[1]].into_iter().collect();

        let found = find_body_ancestor(
            es[3],
            |e| parents.get(&e).copied(),
            |e| bodies.contains(&e),
        );

        assert_eq!(found, Some(es[1]));
    }

    #[test]
    fn stops_at_root_without_match() {
        let mut world = World::new();
        let es = spawn_many(&mut world, 3);
        let parents: HashMap<Entity, Entity> =
            [(es[2], es[1]), (es[1], es[0])].into_iter().collect();

        let found = find_body_ancestor(es[2], |e| parents.get(&e).copied(), |_| false);

        assert_eq!(found, None);
    }

    #[test]
    fn terminates_on_cyclic_parents() {
        let mut world = World::new();
        let es = spawn_many(&mut world, 2);
        let parents: HashMap<Entity, Entity> = [(es[0], es[1]), (es[1], es[0])].into_iter().collect();

        let found = find_body_ancestor(es[0], |e| parents.get(&e).copied(), |_| false);

        assert_eq!(found, None);
    }

    #[test]
    fn walks_child_of_relationships() {
        #[derive(Component)]
        struct Marker;

        let mut world = World::new();
        let root = world.spawn(Marker).id();
        let middle = world.spawn(ChildOf(root)).id();
        let leaf = world.spawn(ChildOf(middle)).id();
        let stray = world.spawn_empty().id();

        let mut system_state: SystemState<(Query<&ChildOf>, Query<(), With<Marker>>)> =
            SystemState::new(&mut world);
        let (parents, markers) = system_state.get(&world);

        assert_eq!(find_body_ancestor_in(leaf, &parents, &markers), Some(root));
        assert_eq!(find_body_ancestor_in(stray, &parents, &markers), None);
    }
}
