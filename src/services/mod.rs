// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod booking;
pub mod email;
pub mod nutrition;
pub mod password;
pub mod payment;
pub mod profile;

pub use email::EmailService;
pub use payment::PaymentService;
