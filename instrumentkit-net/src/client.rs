//! The client runtime: `Client` wraps a [`Dealer`] with an outer retry
//! envelope and offers the common operations as typed helper methods, plus
//! a generic `ask` for everything else.

use std::net::ToSocketAddrs;
use std::thread;
use std::time::Duration;

use instrumentkit_types::{Instruction, Operation, Response};

use crate::dealer::Dealer;
use crate::error::ClientError;

const BACKOFF_BASE: Duration = Duration::from_secs(1);

pub struct Client {
    dealer: Dealer,
    max_retries: u32,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs, timeout: Duration, max_retries: u32) -> Result<Self, ClientError> {
        let dealer = Dealer::connect(addr, timeout)?;
        Ok(Client { dealer, max_retries })
    }

    /// Send `instruction` and return its decoded reply, applying base-1s
    /// exponential backoff across up to `max_retries` attempts — retried at
    /// this layer, not inside a single framed request.
    pub fn ask(&mut self, instruction: Instruction) -> Result<Response, ClientError> {
        let mut attempt = 0;
        loop {
            match self.dealer.request(&instruction) {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries => {
                    let backoff = BACKOFF_BASE * 2u32.saturating_pow(attempt);
                    log::warn!("request attempt {} failed ({e}), retrying in {backoff:?}", attempt + 1);
                    thread::sleep(backoff);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn list_instruments(&mut self) -> Result<Vec<String>, ClientError> {
        let response = self.ask(Instruction::new(Operation::ListInstruments))?;
        expect_value(response)
    }

    pub fn get_blueprint(&mut self, name: &str) -> Result<instrumentkit_types::InstrumentBlueprint, ClientError> {
        let response = self.ask(Instruction::new(Operation::GetBlueprint).with_target(name))?;
        expect_value(response)
    }

    pub fn find_or_create_instrument(
        &mut self,
        name: &str,
        class_path: &str,
    ) -> Result<(), ClientError> {
        let mut instr = Instruction::new(Operation::CreateInstrument).with_target(name).with_name(class_path);
        instr.kwargs = Some([("find_or_create".to_string(), serde_json::json!(true))].into_iter().collect());
        match self.ask(instr)? {
            Response::Ok { .. } => Ok(()),
            Response::Err { error } => Err(ClientError::Remote { kind: error.kind, message: error.message }),
        }
    }
}

fn expect_value<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    match response {
        Response::Ok { value: Some(v) } => serde_json::from_value(v).map_err(ClientError::from),
        Response::Ok { value: None } => {
            Err(ClientError::Remote { kind: instrumentkit_types::ErrorKind::Internal, message: "expected a value, got none".into() })
        }
        Response::Err { error } => Err(ClientError::Remote { kind: error.kind, message: error.message }),
    }
}
