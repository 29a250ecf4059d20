//! Slot arena of moving objects
//!
//! Objects live in a generational slot table; parent/child links are
//! [`ObjectId`]s, so a link to a removed object simply stops resolving.
//! Slot 0 is reserved and never handed out.
//!
//! Callers drive the simulation by calling [`MoveWorld::update`] once per
//! object per tick. Parents must be updated before their children for the
//! children to see this tick's parent position; [`MoveWorld::update_all`]
//! walks slots in order and leaves that to spawn order.

use glam::DVec2;

use super::id::ObjectId;
use super::object::MoveObject;
use super::pattern::{ObjectDirectory, StepContext};
use crate::error::{MotionError, Result};
use crate::normalize_angle;

pub struct MoveWorld {
    objects: Vec<Option<MoveObject>>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,
}

impl Default for MoveWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveWorld {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        // +1 for the reserved slot 0
        let mut objects = Vec::with_capacity(capacity.saturating_add(1));
        let mut generations = Vec::with_capacity(capacity.saturating_add(1));
        objects.push(None);
        generations.push(0);
        Self {
            objects,
            generations,
            free_indices: Vec::new(),
        }
    }

    /// Create an unparented object at `(x, y)` with no pattern
    pub fn spawn(&mut self, x: f64, y: f64) -> ObjectId {
        let position = DVec2::new(x, y);
        if let Some(index) = self.free_indices.pop() {
            let id = ObjectId::from_parts(index as u32, self.generations[index]);
            self.objects[index] = Some(MoveObject::new(id, position));
            return id;
        }

        let index = self.objects.len();
        let id = ObjectId::from_parts(index as u32, 0);
        self.objects.push(Some(MoveObject::new(id, position)));
        self.generations.push(0);
        id
    }

    fn slot(&self, id: ObjectId) -> Option<usize> {
        let index = id.index() as usize;
        if index == 0 || index >= self.objects.len() || self.generations[index] != id.generation() {
            return None;
        }
        self.objects[index].as_ref().map(|_| index)
    }

    pub fn get(&self, id: ObjectId) -> Option<&MoveObject> {
        self.slot(id).and_then(|index| self.objects[index].as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MoveObject> {
        self.slot(id).and_then(|index| self.objects[index].as_mut())
    }

    fn live(&self, id: ObjectId) -> Result<&MoveObject> {
        self.get(id).ok_or(MotionError::StaleObject(id))
    }

    fn live_mut(&mut self, id: ObjectId) -> Result<&mut MoveObject> {
        self.get_mut(id).ok_or(MotionError::StaleObject(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.iter().all(|o| o.is_none())
    }

    /// Live objects in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &MoveObject)> {
        self.objects
            .iter()
            .skip(1)
            .filter_map(|o| o.as_ref().map(|o| (o.id(), o)))
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Remove an object. Its parent forgets it; its children become roots
    /// and keep their absolute position.
    pub fn remove(&mut self, id: ObjectId) -> Result<MoveObject> {
        let index = self.slot(id).ok_or(MotionError::StaleObject(id))?;
        self.generations[index] = self.generations[index].wrapping_add(1);
        let removed = self.objects[index].take().ok_or(MotionError::StaleObject(id))?;
        self.free_indices.push(index);

        if let Some(parent) = removed.parent.and_then(|p| self.get_mut(p)) {
            parent.children.remove(&id);
        }
        for &child_id in &removed.children {
            if let Some(child) = self.get_mut(child_id) {
                child.parent = None;
                child.relative_position = child.position;
            }
        }

        log::debug!("Removed object {} ({} children orphaned)", id, removed.children.len());
        Ok(removed)
    }

    /// Set the absolute position. A parented object gets its relative
    /// position re-derived through the inverse parent transform.
    pub fn set_position(&mut self, id: ObjectId, x: f64, y: f64) -> Result<()> {
        self.live(id)?;
        let position = DVec2::new(x, y);
        if !position.is_finite() {
            log::warn!("Ignoring non-finite position ({}, {}) for object {}", x, y, id);
            return Ok(());
        }
        self.place_absolute(id, position);
        self.propagate(id);
        Ok(())
    }

    /// Set the offset from the parent; without a parent this is
    /// [`set_position`](Self::set_position).
    pub fn set_relative_position(&mut self, id: ObjectId, x: f64, y: f64) -> Result<()> {
        let relative = DVec2::new(x, y);
        if !relative.is_finite() {
            log::warn!("Ignoring non-finite relative position ({}, {}) for object {}", x, y, id);
            return Ok(());
        }
        self.live_mut(id)?.relative_position = relative;
        self.derive_absolute(id);
        self.propagate(id);
        Ok(())
    }

    /// Re-derive the absolute position from the stored relative one, e.g.
    /// after changing the parent rotation or scale.
    pub fn update_relative_position(&mut self, id: ObjectId) -> Result<()> {
        self.live(id)?;
        self.derive_absolute(id);
        self.propagate(id);
        Ok(())
    }

    /// Attach `child` to `parent`, or detach it with `None`.
    ///
    /// The absolute position is kept. Making an object its own ancestor is
    /// refused with [`MotionError::CyclicParent`] and changes nothing.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<()> {
        let old_parent = self.live(child)?.parent;
        if let Some(parent) = parent {
            self.live(parent)?;
            if parent == child || self.is_ancestor(child, parent) {
                log::warn!("Refusing to parent {} under its own descendant {}", child, parent);
                return Err(MotionError::CyclicParent { child, parent });
            }
        }
        if old_parent == parent {
            return Ok(());
        }

        if let Some(old) = old_parent.and_then(|p| self.get_mut(p)) {
            old.children.remove(&child);
        }
        if let Some(new) = parent.and_then(|p| self.get_mut(p)) {
            new.children.insert(child);
        }
        let position = self.live_mut(child)?.position;
        self.live_mut(child)?.parent = parent;
        self.place_absolute(child, position);
        Ok(())
    }

    /// Whether `ancestor` appears on the parent chain of `id`
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        let mut current = self.get(id).and_then(MoveObject::parent);
        // Bounded walk; the chain can never be longer than the population
        for _ in 0..self.objects.len() {
            match current {
                Some(p) if p == ancestor => return true,
                Some(p) => current = self.get(p).and_then(MoveObject::parent),
                None => return false,
            }
        }
        false
    }

    /// Copy the active pattern (rebound to `dst`) and scalar kinematic state
    /// of `src` onto `dst`. Parent/child links, the schedule and frame
    /// counters of `dst` are untouched.
    pub fn copy_kinematics(&mut self, dst: ObjectId, src: ObjectId) -> Result<()> {
        let dst_index = self.slot(dst).ok_or(MotionError::StaleObject(dst))?;
        let src_index = self.slot(src).ok_or(MotionError::StaleObject(src))?;
        if dst_index == src_index {
            return Ok(());
        }

        let (dst_slot, src_slot) = if dst_index < src_index {
            let (lo, hi) = self.objects.split_at_mut(src_index);
            (&mut lo[dst_index], &hi[0])
        } else {
            let (lo, hi) = self.objects.split_at_mut(dst_index);
            (&mut hi[0], &lo[src_index])
        };
        if let (Some(dst_obj), Some(src_obj)) = (dst_slot.as_mut(), src_slot.as_ref()) {
            dst_obj.copy_kinematics_from(src_obj);
        }

        // Relative position must be expressed in dst's own parent frame
        let position = self.live(dst)?.position;
        self.place_absolute(dst, position);
        self.propagate(dst);
        Ok(())
    }

    /// One tick for one object: activate due patterns, integrate, derive the
    /// absolute position, move descendants along, advance the frame counter.
    pub fn update(&mut self, id: ObjectId) -> Result<()> {
        let obj = self.live_mut(id)?;
        obj.promote_scheduled();

        let mut moved = false;
        let pattern = if obj.is_movement_enabled() {
            obj.pattern.take()
        } else {
            None
        };
        if let Some(mut pattern) = pattern {
            let absolute = obj.position;
            let mut relative = obj.relative_position;
            let ctx =
                StepContext::new(absolute, &*self).with_frame_rotation(self.frame_rotation(id));
            pattern.advance(&mut relative, &ctx);

            let obj = self.live_mut(id)?;
            if relative.is_finite() {
                obj.relative_position = relative;
            } else {
                log::warn!("Object {} produced a non-finite position, holding it in place", id);
            }
            obj.pattern = Some(pattern);
            moved = true;
        }

        self.derive_absolute(id);
        self.propagate(id);
        self.live_mut(id)?.finish_tick(moved);
        Ok(())
    }

    /// Update every live object once, in slot order
    pub fn update_all(&mut self) {
        for id in self.ids() {
            if let Err(e) = self.update(id) {
                log::warn!("Skipping update of {}: {}", id, e);
            }
        }
    }

    /// World-space angle (radians) of the x axis `id` moves in. Roots and
    /// orphans move in the world frame; a negative scale flips the axes.
    fn frame_rotation(&self, id: ObjectId) -> f64 {
        let Some(obj) = self.get(id) else {
            return 0.0;
        };
        if obj.parent.and_then(|p| self.get(p)).is_none() {
            return 0.0;
        }
        let transform = obj.transform();
        let rotation = transform.rotation().to_radians();
        if transform.scale() < 0.0 {
            normalize_angle(rotation + std::f64::consts::PI)
        } else {
            rotation
        }
    }

    /// Store an absolute position and re-derive the relative one for the
    /// current parent. A degenerate parent transform keeps the old offset.
    fn place_absolute(&mut self, id: ObjectId, position: DVec2) {
        let parent_position = self
            .get(id)
            .and_then(MoveObject::parent)
            .and_then(|p| self.get(p))
            .map(MoveObject::position);
        let Some(obj) = self.get_mut(id) else {
            return;
        };
        obj.position = position;
        match parent_position {
            Some(parent) => {
                if let Some(relative) = obj.transform().to_relative(parent, position) {
                    obj.relative_position = relative;
                }
            }
            None => obj.relative_position = position,
        }
    }

    fn derive_absolute(&mut self, id: ObjectId) {
        let Some(obj) = self.get(id) else {
            return;
        };
        let absolute = match obj.parent.and_then(|p| self.get(p)) {
            Some(parent) => obj.transform().to_absolute(parent.position, obj.relative_position),
            None => obj.relative_position,
        };
        if !absolute.is_finite() {
            log::warn!("Object {} resolved to a non-finite position, holding it in place", id);
            return;
        }
        if let Some(obj) = self.get_mut(id) {
            obj.position = absolute;
        }
    }

    /// Re-derive the absolute position of every descendant of `id`
    fn propagate(&mut self, id: ObjectId) {
        let mut stack: Vec<ObjectId> = match self.get(id) {
            Some(obj) => obj.children.iter().copied().collect(),
            None => return,
        };
        while let Some(child) = stack.pop() {
            self.derive_absolute(child);
            if let Some(obj) = self.get(child) {
                stack.extend(obj.children.iter().copied());
            }
        }
    }
}

impl ObjectDirectory for MoveWorld {
    fn position(&self, id: ObjectId) -> Option<DVec2> {
        self.get(id).map(MoveObject::position)
    }

    fn heading(&self, id: ObjectId) -> Option<f64> {
        let local = self.get(id)?.direction_angle();
        Some(normalize_angle(local + self.frame_rotation(id)))
    }
}
