// Trading cycle, order decisions and position bookkeeping
pub mod cycle;
pub mod executor;
pub mod gateway;
pub mod position_manager;
pub mod scheduler;

pub use cycle::{CycleReport, TradingCycle};
pub use executor::{ExecutionAction, ExecutionDecision, Executor};
pub use gateway::MarketDataGateway;
pub use position_manager::{PositionError, PositionManager};
pub use scheduler::Scheduler;
