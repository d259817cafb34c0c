// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial tiling of entities
//!
//! Entities are partitioned with a recursive median split on the longest
//! axis of the partition's bounding box until the diagonal drops under the
//! configured threshold. The split key is the entity's AABB center with the
//! entity id as the final tie-break, so the partition depends only on the
//! entity set, never on insertion order.

use crate::geometry::EntityId;
use crate::math::Aabb;
use nalgebra::Point3;

/// Entity bounds fed into the partitioner
#[derive(Debug, Clone)]
pub(crate) struct EntityBounds {
    /// Index into the surviving entity list
    pub index: usize,
    pub entity_id: EntityId,
    pub aabb: Aabb,
    pub center: Point3<f64>,
}

/// Union AABB over a set of entity bounds
pub(crate) fn union_aabb(entries: &[EntityBounds]) -> Aabb {
    let mut aabb = Aabb::empty();
    for entry in entries {
        aabb.expand(&entry.aabb);
    }
    aabb
}

/// Partition entities into tile-sized groups
///
/// Every input entity lands in exactly one output group. A group is a leaf
/// when its union AABB diagonal is within `min_tile_size` or it cannot be
/// split further.
pub(crate) fn partition(mut entries: Vec<EntityBounds>, min_tile_size: f64) -> Vec<Vec<EntityBounds>> {
    let mut leaves = Vec::new();
    split(&mut entries, min_tile_size, &mut leaves);
    leaves
}

fn split(entries: &mut Vec<EntityBounds>, min_tile_size: f64, leaves: &mut Vec<Vec<EntityBounds>>) {
    let aabb = union_aabb(entries);
    if entries.len() < 2 || aabb.diagonal() <= min_tile_size {
        leaves.push(std::mem::take(entries));
        return;
    }

    let axis = aabb.longest_axis();
    entries.sort_unstable_by(|a, b| {
        a.center[axis]
            .total_cmp(&b.center[axis])
            .then_with(|| a.center.x.total_cmp(&b.center.x))
            .then_with(|| a.center.y.total_cmp(&b.center.y))
            .then_with(|| a.center.z.total_cmp(&b.center.z))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });

    let mid = entries.len() / 2;
    let mut right: Vec<EntityBounds> = entries.split_off(mid);
    split(entries, min_tile_size, leaves);
    split(&mut right, min_tile_size, leaves);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(id: u32, center: [f64; 3], half: f64) -> EntityBounds {
        let c = Point3::new(center[0], center[1], center[2]);
        EntityBounds {
            index: id as usize,
            entity_id: EntityId(id),
            aabb: Aabb::new(
                Point3::new(c.x - half, c.y - half, c.z - half),
                Point3::new(c.x + half, c.y + half, c.z + half),
            ),
            center: c,
        }
    }

    #[test]
    fn test_small_model_is_one_tile() {
        let entries = vec![bounds(0, [0.0, 0.0, 0.0], 1.0), bounds(1, [5.0, 0.0, 0.0], 1.0)];
        let leaves = partition(entries, 500.0);
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].len(), 2);
    }

    #[test]
    fn test_splits_until_diagonal_bound() {
        // Two clusters 10km apart, each a few meters wide
        let mut entries = Vec::new();
        for i in 0..4 {
            entries.push(bounds(i, [i as f64 * 2.0, 0.0, 0.0], 1.0));
        }
        for i in 0..4 {
            entries.push(bounds(4 + i, [10_000.0 + i as f64 * 2.0, 0.0, 0.0], 1.0));
        }
        let leaves = partition(entries, 500.0);
        assert!(leaves.len() >= 2);
        for leaf in &leaves {
            let aabb = union_aabb(leaf);
            assert!(leaf.len() == 1 || aabb.diagonal() <= 500.0);
        }
        let total: usize = leaves.iter().map(Vec::len).sum();
        assert_eq!(total, 8);
    }

    #[test]
    fn test_partition_ignores_insertion_order() {
        let make = || {
            vec![
                bounds(0, [0.0, 0.0, 0.0], 1.0),
                bounds(1, [1000.0, 0.0, 0.0], 1.0),
                bounds(2, [0.0, 1000.0, 0.0], 1.0),
                bounds(3, [1000.0, 1000.0, 0.0], 1.0),
            ]
        };
        let mut shuffled = make();
        shuffled.reverse();

        let mut a: Vec<Vec<u32>> = partition(make(), 500.0)
            .into_iter()
            .map(|leaf| {
                let mut ids: Vec<u32> = leaf.iter().map(|e| e.entity_id.0).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        let mut b: Vec<Vec<u32>> = partition(shuffled, 500.0)
            .into_iter()
            .map(|leaf| {
                let mut ids: Vec<u32> = leaf.iter().map(|e| e.entity_id.0).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_coincident_entities_terminate() {
        // Four entities at the same spot wider than the threshold
        let entries = (0..4).map(|i| bounds(i, [0.0, 0.0, 0.0], 400.0)).collect();
        let leaves = partition(entries, 10.0);
        let total: usize = leaves.iter().map(Vec::len).sum();
        assert_eq!(total, 4);
        for leaf in &leaves {
            assert_eq!(leaf.len(), 1);
        }
    }
}
