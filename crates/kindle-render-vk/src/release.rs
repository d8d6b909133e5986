// SPDX-License-Identifier: CEPL-1.0
use ash::prelude::VkResult;
use tracing::debug;

use crate::error::{ContextError, Resource};

type Release = Box<dyn FnOnce()>;

/// Destroy calls for everything created so far, run last-in first-out.
///
/// Dropping the stack releases whatever it still holds, so an early `?` in
/// the middle of context creation unwinds exactly the objects already made.
#[derive(Default)]
pub(crate) struct ReleaseStack {
    entries: Vec<(Resource, Release)>,
}

impl ReleaseStack {
    pub(crate) fn push(&mut self, resource: Resource, release: impl FnOnce() + 'static) {
        self.entries.push((resource, Box::new(release)));
    }

    /// Safe to call any number of times; released entries are gone.
    pub(crate) fn release_all(&mut self) {
        while let Some((resource, release)) = self.entries.pop() {
            debug!("releasing {resource}");
            release();
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn held(&self) -> impl Iterator<Item = Resource> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Run one create call and, on success, register its matching destroy call.
///
/// `release` receives its own copy of the handle; loaders it needs must be
/// moved in by the caller.
pub(crate) fn acquire<T, C, R>(
    stack: &mut ReleaseStack,
    resource: Resource,
    create: C,
    release: R,
) -> Result<T, ContextError>
where
    T: Clone + 'static,
    C: FnOnce() -> VkResult<T>,
    R: FnOnce(T) + 'static,
{
    let handle = create()
        .map_err(|source| ContextError::ResourceCreationFailed { resource, source })?;
    let owned = handle.clone();
    stack.push(resource, move || release(owned));
    debug!("created {resource}");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(Resource, u32)>>>;

    const ORDER: [Resource; 5] = [
        Resource::Instance,
        Resource::DebugMessenger,
        Resource::Surface,
        Resource::Device,
        Resource::Swapchain,
    ];

    /// Walk the creation order, failing the create call at `fail_at`.
    fn build_until(fail_at: Option<usize>, log: &Log) -> Result<ReleaseStack, ContextError> {
        let mut stack = ReleaseStack::default();
        for (step, resource) in ORDER.into_iter().enumerate() {
            let log = Rc::clone(log);
            acquire(
                &mut stack,
                resource,
                || {
                    if Some(step) == fail_at {
                        Err(vk::Result::ERROR_INITIALIZATION_FAILED)
                    } else {
                        Ok(step as u32)
                    }
                },
                move |handle| log.borrow_mut().push((resource, handle)),
            )?;
        }
        Ok(stack)
    }

    #[test]
    fn release_runs_in_reverse_creation_order() {
        let log = Log::default();
        let mut stack = build_until(None, &log).unwrap();
        assert!(log.borrow().is_empty());

        stack.release_all();
        let released: Vec<_> = log.borrow().iter().map(|(r, _)| *r).collect();
        let mut expected = ORDER.to_vec();
        expected.reverse();
        assert_eq!(released, expected);
    }

    #[test]
    fn failure_releases_only_earlier_steps() {
        for fail_at in 0..ORDER.len() {
            let log = Log::default();
            let err = build_until(Some(fail_at), &log).err().unwrap();
            match err {
                ContextError::ResourceCreationFailed { resource, .. } => {
                    assert_eq!(resource, ORDER[fail_at])
                }
                other => panic!("unexpected error {other:?}"),
            }

            let released = log.borrow().clone();
            let expected: Vec<_> = (0..fail_at)
                .rev()
                .map(|step| (ORDER[step], step as u32))
                .collect();
            assert_eq!(released, expected, "failure at step {fail_at}");
        }
    }

    #[test]
    fn release_all_is_idempotent() {
        let log = Log::default();
        let mut stack = build_until(None, &log).unwrap();
        stack.release_all();
        stack.release_all();
        drop(stack);
        assert_eq!(log.borrow().len(), ORDER.len());
    }

    #[test]
    fn held_lists_creation_order() {
        let log = Log::default();
        let mut stack = build_until(None, &log).unwrap();
        assert_eq!(stack.held().collect::<Vec<_>>(), ORDER.to_vec());
        stack.release_all();
        assert!(stack.is_empty());
    }
}
