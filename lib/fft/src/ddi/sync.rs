// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Lock wrappers with a kernel-style API.
//!
//! `lock()`, `read()` and `write()` hand back a guard directly rather
//! than a `LockResult`. A panic while holding a lock cannot leave the
//! flow table in a state that violates its invariants (every mutation
//! is a single `Vec` operation), so a poisoned lock is simply
//! recovered.

use core::ops::Deref;
use core::ops::DerefMut;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

/// A mutual exclusion lock.
#[derive(Debug, Default)]
pub struct KMutex<T> {
    inner: Mutex<T>,
}

pub struct KMutexGuard<'a, T: 'a> {
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for KMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.deref()
    }
}

impl<T> DerefMut for KMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.deref_mut()
    }
}

impl<T> KMutex<T> {
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn new(val: T) -> Self {
        KMutex { inner: Mutex::new(val) }
    }

    pub fn lock(&self) -> KMutexGuard<'_, T> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        KMutexGuard { guard }
    }
}

/// A reader/writer lock.
#[derive(Debug, Default)]
pub struct KRwLock<T> {
    inner: RwLock<T>,
}

pub struct KRwLockReadGuard<'a, T: 'a> {
    guard: RwLockReadGuard<'a, T>,
}

pub struct KRwLockWriteGuard<'a, T: 'a> {
    guard: RwLockWriteGuard<'a, T>,
}

impl<T> Deref for KRwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.deref()
    }
}

impl<T> Deref for KRwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.guard.deref()
    }
}

impl<T> DerefMut for KRwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.guard.deref_mut()
    }
}

impl<T> KRwLock<T> {
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn new(val: T) -> Self {
        KRwLock { inner: RwLock::new(val) }
    }

    pub fn read(&self) -> KRwLockReadGuard<'_, T> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        KRwLockReadGuard { guard }
    }

    pub fn write(&self) -> KRwLockWriteGuard<'_, T> {
        let guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        KRwLockWriteGuard { guard }
    }
}
