//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All of them are rebuildable from the event stream, isolated per
//! structure, and idempotent under at-least-once delivery.

pub mod breakdown_counters;
pub mod expiry_board;
pub mod profit_loss;
pub mod vehicle_board;

pub use breakdown_counters::{BreakdownCountersProjection, BreakdownProjectionError, BreakdownRow};
pub use expiry_board::{ClassifiedDocument, DocumentRow, ExpiryBoard, ExpiryBoardProjection,
    ExpiryProjectionError};
pub use profit_loss::{ProfitLossProjection, ProfitLossProjectionError, ProfitLossSummary};
pub use vehicle_board::{VehicleBoardProjection, VehicleProjectionError, VehicleRow};
