// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Lexical scope frames kept in an arena
//!
//! Frames refer to their parent by [`FrameId`]. A released slot is reused
//! under a new generation, so a stale id never resolves to a newer frame.

use super::children::ChildrenSlot;
use super::registry::{Function, Operator};
use super::value::Value;
use ahash::AHashMap;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    index: u32,
    generation: u32,
}

#[derive(Default)]
pub(crate) struct Frame {
    parent: Option<FrameId>,
    variables: AHashMap<String, Value>,
    operators: AHashMap<String, Operator>,
    functions: AHashMap<String, Function>,
    children: Option<Rc<ChildrenSlot>>,
}

struct Slot {
    generation: u32,
    frame: Option<Frame>,
}

#[derive(Default)]
pub(crate) struct ScopeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl ScopeArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, parent: Option<FrameId>) -> FrameId {
        let frame = Frame {
            parent,
            ..Frame::default()
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.frame = Some(frame);
            return FrameId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            frame: Some(frame),
        });
        FrameId {
            index,
            generation: 0,
        }
    }

    /// Remove a frame, handing it back so the caller can drop it after
    /// releasing any borrow of the arena
    pub(crate) fn release(&mut self, id: FrameId) -> Option<Frame> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let frame = slot.frame.take()?;
        self.free.push(id.index);
        self.live -= 1;
        Some(frame)
    }

    /// Number of frames currently alive
    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.live
    }

    fn frame(&self, id: FrameId) -> Option<&Frame> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.frame.as_ref()
    }

    fn frame_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.frame.as_mut()
    }

    /// Walk from `id` outward and return the first hit of `pick`
    fn find<T>(&self, id: FrameId, pick: impl Fn(&Frame) -> Option<T>) -> Option<T> {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let frame = self.frame(current)?;
            if let Some(found) = pick(frame) {
                return Some(found);
            }
            cursor = frame.parent;
        }
        None
    }

    pub(crate) fn lookup_var(&self, id: FrameId, name: &str) -> Option<Value> {
        self.find(id, |f| f.variables.get(name).cloned())
    }

    /// Assignment always targets the given frame, never an ancestor
    pub(crate) fn set_var(&mut self, id: FrameId, name: &str, value: Value) {
        if let Some(frame) = self.frame_mut(id) {
            frame.variables.insert(name.to_string(), value);
        }
    }

    pub(crate) fn define_operator(&mut self, id: FrameId, name: &str, operator: Operator) {
        if let Some(frame) = self.frame_mut(id) {
            frame.operators.insert(name.to_string(), operator);
        }
    }

    pub(crate) fn define_function(&mut self, id: FrameId, name: &str, function: Function) {
        if let Some(frame) = self.frame_mut(id) {
            frame.functions.insert(name.to_string(), function);
        }
    }

    pub(crate) fn lookup_operator(&self, id: FrameId, name: &str) -> Option<Operator> {
        self.find(id, |f| f.operators.get(name).cloned())
    }

    pub(crate) fn lookup_function(&self, id: FrameId, name: &str) -> Option<Function> {
        self.find(id, |f| f.functions.get(name).cloned())
    }

    pub(crate) fn set_children(&mut self, id: FrameId, slot: Rc<ChildrenSlot>) {
        if let Some(frame) = self.frame_mut(id) {
            frame.children = Some(slot);
        }
    }

    /// Children of the nearest enclosing module invocation
    pub(crate) fn find_children(&self, id: FrameId) -> Option<Rc<ChildrenSlot>> {
        self.find(id, |f| f.children.clone())
    }
}

/// Owns a frame for as long as the block using it is alive
pub(crate) struct FrameGuard {
    arena: Rc<RefCell<ScopeArena>>,
    id: FrameId,
}

impl FrameGuard {
    pub(crate) fn push(arena: &Rc<RefCell<ScopeArena>>, parent: Option<FrameId>) -> Self {
        let id = arena.borrow_mut().push(parent);
        Self {
            arena: arena.clone(),
            id,
        }
    }

    pub(crate) fn id(&self) -> FrameId {
        self.id
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        // Dropping a frame can drop closures that own other guards
        let released = match self.arena.try_borrow_mut() {
            Ok(mut arena) => arena.release(self.id),
            Err(_) => None,
        };
        drop(released);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outward_and_assignment_stays_local() {
        let mut arena = ScopeArena::new();
        let root = arena.push(None);
        let inner = arena.push(Some(root));

        arena.set_var(root, "x", Value::Number(3.0));
        assert_eq!(arena.lookup_var(inner, "x"), Some(Value::Number(3.0)));

        arena.set_var(inner, "x", Value::Number(14.0));
        assert_eq!(arena.lookup_var(inner, "x"), Some(Value::Number(14.0)));
        assert_eq!(arena.lookup_var(root, "x"), Some(Value::Number(3.0)));
        assert_eq!(arena.lookup_var(root, "y"), None);
    }

    #[test]
    fn test_released_ids_go_stale() {
        let mut arena = ScopeArena::new();
        let root = arena.push(None);
        let old = arena.push(Some(root));
        arena.set_var(old, "v", Value::Bool(true));
        assert!(arena.release(old).is_some());

        let reused = arena.push(Some(root));
        assert_ne!(old, reused);
        assert_eq!(arena.lookup_var(old, "v"), None);
        assert_eq!(arena.lookup_var(reused, "v"), None);
        assert!(arena.release(old).is_none());
        assert_eq!(arena.live(), 2);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let arena = Rc::new(RefCell::new(ScopeArena::new()));
        {
            let root = FrameGuard::push(&arena, None);
            let _child = FrameGuard::push(&arena, Some(root.id()));
            assert_eq!(arena.borrow().live(), 2);
        }
        assert_eq!(arena.borrow().live(), 0);
    }
}
