//! Wire and data model for instrumentkit.
//!
//! Defines the vocabulary shared by the server dispatcher, the transport
//! layer, and the client runtime: parameter values and validators,
//! blueprints (transportable descriptions of an instrument's tree), the
//! instruction/response wire protocol, and the error taxonomy.

pub mod blueprint;
pub mod broadcast;
pub mod error;
pub mod instruction;
pub mod response;
pub mod validator;
pub mod value;

pub use blueprint::{InstrumentBlueprint, MethodBlueprint, ParameterBlueprint};
pub use broadcast::BroadcastBody;
pub use error::ErrorKind;
pub use instruction::{Instruction, Operation};
pub use response::{ErrorBody, Response};
pub use validator::ValidatorSpec;
pub use value::{ParamValue, ValueKind};
