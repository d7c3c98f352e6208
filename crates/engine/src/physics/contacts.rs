use std::collections::HashSet;

use crate::app::EntityId;
use crate::math::Vec2;

use super::body::{Aabb, CollisionLayers, PhysicsBody};

/// Order-independent identity of a contact between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactKey {
    first: EntityId,
    second: EntityId,
}

impl ContactKey {
    pub fn new(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn first(&self) -> EntityId {
        self.first
    }

    pub fn second(&self) -> EntityId {
        self.second
    }

    pub fn involves(&self, id: EntityId) -> bool {
        self.first == id || self.second == id
    }

    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.first == id {
            Some(self.second)
        } else if self.second == id {
            Some(self.first)
        } else {
            None
        }
    }
}

/// What the overlap pass needs to know about one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactProbe {
    pub owner: EntityId,
    pub aabb: Aabb,
    pub category: CollisionLayers,
    pub contact_mask: CollisionLayers,
}

impl ContactProbe {
    pub fn from_body(owner: EntityId, body: &PhysicsBody) -> Self {
        Self {
            owner,
            aabb: body.aabb(),
            category: body.category,
            contact_mask: body.contact_mask,
        }
    }
}

/// Overlap between two bodies. `a < b` always holds and `normal` points from
/// `b` toward `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub a: EntityId,
    pub b: EntityId,
    pub normal: Vec2,
    pub began: bool,
}

impl Contact {
    /// Builds a contact from one participant's point of view.
    pub fn new(subject: EntityId, other: EntityId, normal_for_subject: Vec2) -> Self {
        if subject <= other {
            Self {
                a: subject,
                b: other,
                normal: normal_for_subject,
                began: false,
            }
        } else {
            Self {
                a: other,
                b: subject,
                normal: -normal_for_subject,
                began: false,
            }
        }
    }

    pub fn key(&self) -> ContactKey {
        ContactKey::new(self.a, self.b)
    }

    /// Normal pointing toward `id`, or `None` if `id` is not part of the contact.
    pub fn normal_for(&self, id: EntityId) -> Option<Vec2> {
        if id == self.a {
            Some(self.normal)
        } else if id == self.b {
            Some(-self.normal)
        } else {
            None
        }
    }

    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        self.key().other(id)
    }
}

/// Sweep-and-prune along x over every probe, reporting pairs where either
/// side's contact mask selects the other's category.
pub fn detect_overlaps(probes: &[ContactProbe], out: &mut Vec<Contact>) {
    out.clear();
    let mut order: Vec<usize> = (0..probes.len())
        .filter(|&i| !probes[i].category.is_empty() || !probes[i].contact_mask.is_empty())
        .collect();
    order.sort_by(|&l, &r| probes[l].aabb.min_x().total_cmp(&probes[r].aabb.min_x()));

    for (cursor, &i) in order.iter().enumerate() {
        let left = &probes[i];
        for &j in &order[cursor + 1..] {
            let right = &probes[j];
            if right.aabb.min_x() >= left.aabb.max_x() {
                break;
            }
            if left.owner == right.owner || !wants_contact(left, right) {
                continue;
            }
            if let Some(depth) = left.aabb.penetration(&right.aabb) {
                let normal = separation_normal(&left.aabb, &right.aabb, depth);
                out.push(Contact::new(left.owner, right.owner, normal));
            }
        }
    }

    out.sort_by_key(Contact::key);
}

fn wants_contact(a: &ContactProbe, b: &ContactProbe) -> bool {
    a.contact_mask.intersects(b.category) || b.contact_mask.intersects(a.category)
}

/// Normal from `other` toward `subject` along the axis of least penetration.
fn separation_normal(subject: &Aabb, other: &Aabb, depth: Vec2) -> Vec2 {
    if depth.x < depth.y {
        let direction = if subject.center.x >= other.center.x {
            1.0
        } else {
            -1.0
        };
        Vec2::new(direction, 0.0)
    } else {
        let direction = if subject.center.y >= other.center.y {
            1.0
        } else {
            -1.0
        };
        Vec2::new(0.0, direction)
    }
}

/// Remembers which contacts were active last tick so each tick's contacts
/// can be flagged as new, and vanished ones reported as ended.
#[derive(Debug, Default)]
pub struct ContactTracker {
    active: HashSet<ContactKey>,
}

impl ContactTracker {
    /// Marks `began` on each contact and returns the keys that ended, sorted.
    pub fn update(&mut self, contacts: &mut [Contact]) -> Vec<ContactKey> {
        let mut current = HashSet::with_capacity(contacts.len());
        for contact in contacts.iter_mut() {
            let key = contact.key();
            contact.began = !self.active.contains(&key);
            current.insert(key);
        }
        let mut ended: Vec<ContactKey> = self.active.difference(&current).copied().collect();
        ended.sort();
        self.active = current;
        ended
    }

    pub fn is_active(&self, key: &ContactKey) -> bool {
        self.active.contains(key)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drops every contact involving `id` without reporting it as ended.
    pub fn forget(&mut self, id: EntityId) {
        self.active.retain(|key| !key.involves(id));
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }
}

/// Set-keyed ground bookkeeping: a body is supported while at least one
/// supporting contact is active, regardless of begin/end interleaving.
#[derive(Debug, Default, Clone)]
pub struct SupportContacts {
    keys: HashSet<ContactKey>,
}

impl SupportContacts {
    /// Returns false if the contact was already counted.
    pub fn begin(&mut self, key: ContactKey) -> bool {
        self.keys.insert(key)
    }

    /// Returns false if the contact was never counted.
    pub fn end(&mut self, key: ContactKey) -> bool {
        self.keys.remove(&key)
    }

    pub fn is_supported(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAYER: CollisionLayers = CollisionLayers(1 << 0);
    const ENEMY: CollisionLayers = CollisionLayers(1 << 1);
    const COIN: CollisionLayers = CollisionLayers(1 << 2);

    fn probe(
        owner: u64,
        center: Vec2,
        category: CollisionLayers,
        contact_mask: CollisionLayers,
    ) -> ContactProbe {
        ContactProbe {
            owner: EntityId(owner),
            aabb: Aabb::new(center, Vec2::new(10.0, 10.0)),
            category,
            contact_mask,
        }
    }

    #[test]
    fn key_is_order_independent() {
        let ab = ContactKey::new(EntityId(3), EntityId(9));
        let ba = ContactKey::new(EntityId(9), EntityId(3));
        assert_eq!(ab, ba);
        assert_eq!(ab.first(), EntityId(3));
        assert_eq!(ab.other(EntityId(9)), Some(EntityId(3)));
        assert_eq!(ab.other(EntityId(4)), None);
    }

    #[test]
    fn contact_normal_flips_with_participant_order() {
        let contact = Contact::new(EntityId(5), EntityId(2), Vec2::new(0.0, 1.0));
        assert_eq!(contact.a, EntityId(2));
        assert_eq!(contact.normal_for(EntityId(5)), Some(Vec2::new(0.0, 1.0)));
        assert_eq!(contact.normal_for(EntityId(2)), Some(Vec2::new(0.0, -1.0)));
        assert_eq!(contact.normal_for(EntityId(7)), None);
    }

    #[test]
    fn overlaps_are_filtered_by_contact_masks() {
        let probes = [
            probe(1, Vec2::new(0.0, 0.0), PLAYER, ENEMY | COIN),
            probe(2, Vec2::new(5.0, 0.0), ENEMY, PLAYER),
            probe(3, Vec2::new(8.0, 2.0), ENEMY, PLAYER),
            probe(4, Vec2::new(100.0, 0.0), COIN, CollisionLayers::NONE),
        ];
        let mut contacts = Vec::new();
        detect_overlaps(&probes, &mut contacts);

        let keys: Vec<_> = contacts.iter().map(Contact::key).collect();
        assert_eq!(
            keys,
            vec![
                ContactKey::new(EntityId(1), EntityId(2)),
                ContactKey::new(EntityId(1), EntityId(3)),
            ]
        );
    }

    #[test]
    fn stacked_overlap_reports_vertical_normal() {
        let probes = [
            probe(1, Vec2::new(0.0, 16.0), PLAYER, ENEMY),
            probe(2, Vec2::new(2.0, 0.0), ENEMY, PLAYER),
        ];
        let mut contacts = Vec::new();
        detect_overlaps(&probes, &mut contacts);

        assert_eq!(contacts.len(), 1);
        assert_eq!(
            contacts[0].normal_for(EntityId(1)),
            Some(Vec2::new(0.0, 1.0))
        );
    }

    #[test]
    fn tracker_flags_began_once_and_reports_ended() {
        let mut tracker = ContactTracker::default();
        let mut tick = vec![Contact::new(EntityId(1), EntityId(2), Vec2::new(1.0, 0.0))];
        assert!(tracker.update(&mut tick).is_empty());
        assert!(tick[0].began);

        let mut tick = vec![Contact::new(EntityId(2), EntityId(1), Vec2::new(1.0, 0.0))];
        assert!(tracker.update(&mut tick).is_empty());
        assert!(!tick[0].began);

        let ended = tracker.update(&mut []);
        assert_eq!(ended, vec![ContactKey::new(EntityId(1), EntityId(2))]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn support_stays_true_until_last_contact_ends_in_any_order() {
        let player = EntityId(0);
        let left = ContactKey::new(player, EntityId(10));
        let right = ContactKey::new(EntityId(11), player);
        let orders: [[(bool, ContactKey); 4]; 4] = [
            [(true, left), (true, right), (false, left), (false, right)],
            [(true, left), (true, right), (false, right), (false, left)],
            [(true, right), (true, left), (false, left), (false, right)],
            [(true, left), (false, left), (true, right), (false, right)],
        ];

        for order in orders {
            let mut support = SupportContacts::default();
            let mut active = 0usize;
            for (begins, key) in order {
                if begins {
                    assert!(support.begin(key));
                    assert!(!support.begin(key));
                    active += 1;
                } else {
                    assert!(support.end(key));
                    assert!(!support.end(key));
                    active -= 1;
                }
                assert_eq!(support.is_supported(), active > 0);
                assert_eq!(support.count(), active);
            }
        }
    }

    #[test]
    fn forgetting_an_entity_drops_its_contacts_silently() {
        let mut tracker = ContactTracker::default();
        let mut tick = vec![
            Contact::new(EntityId(1), EntityId(2), Vec2::new(1.0, 0.0)),
            Contact::new(EntityId(1), EntityId(3), Vec2::new(1.0, 0.0)),
        ];
        tracker.update(&mut tick);
        tracker.forget(EntityId(2));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_active(&ContactKey::new(EntityId(3), EntityId(1))));
    }
}
