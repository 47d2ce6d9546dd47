// SPDX-License-Identifier: CEPL-1.0
use ash::vk;
use tracing::debug;

use crate::driver::Driver;
use crate::error::{Result, VkError};

/// Synchronisation for one in-flight frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameSlot {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    /// Created signaled so the first wait returns at once.
    pub in_flight: vk::Fence,
}

/// Per-slot semaphores and fences. Only fully built slots are kept; a slot
/// that fails halfway releases its own objects before the error propagates.
#[derive(Debug, Default)]
pub struct FrameSync {
    slots: Vec<FrameSlot>,
}

impl FrameSync {
    pub fn create<D: Driver>(driver: &D, frames_in_flight: usize) -> Result<Self> {
        let mut sync = Self {
            slots: Vec::with_capacity(frames_in_flight),
        };
        for slot in 0..frames_in_flight {
            match unsafe { create_slot(driver) } {
                Ok(s) => sync.slots.push(s),
                Err(source) => {
                    sync.destroy(driver);
                    return Err(VkError::SyncObjectCreation { slot, source });
                }
            }
        }
        debug!(slots = sync.slots.len(), "frame sync objects created");
        Ok(sync)
    }

    /// Per slot: both semaphores, then the fence.
    pub fn destroy<D: Driver>(&mut self, driver: &D) {
        for slot in self.slots.drain(..) {
            unsafe {
                driver.destroy_semaphore(slot.image_available);
                driver.destroy_semaphore(slot.render_finished);
                driver.destroy_fence(slot.in_flight);
            }
        }
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

unsafe fn create_slot<D: Driver>(driver: &D) -> ash::prelude::VkResult<FrameSlot> {
    let image_available = driver.create_semaphore()?;
    let render_finished = match driver.create_semaphore() {
        Ok(s) => s,
        Err(e) => {
            driver.destroy_semaphore(image_available);
            return Err(e);
        }
    };
    let in_flight = match driver.create_fence(true) {
        Ok(f) => f,
        Err(e) => {
            driver.destroy_semaphore(render_finished);
            driver.destroy_semaphore(image_available);
            return Err(e);
        }
    };
    Ok(FrameSlot {
        image_available,
        render_finished,
        in_flight,
    })
}

/// Current frame slot, `0..len`, wrapping on advance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameIndex {
    current: usize,
    len: usize,
}

impl FrameIndex {
    pub fn new(len: usize) -> Self {
        Self {
            current: 0,
            len: len.max(1),
        }
    }

    pub fn get(self) -> usize {
        self.current
    }

    pub fn advance(&mut self) {
        self.current = (self.current + 1) % self.len;
    }
}
