use std::collections::HashMap;

use tracing::debug;

use crate::error::SubmitError;
use crate::metadata::Instrument;
use crate::submit::{EntityRef, InstrumentInput, SubmissionClient};

/// Creation record for an instrument, or `None` when it has no identifier.
pub fn instrument_input(instrument: &Instrument) -> Option<InstrumentInput> {
    if instrument.id.is_empty() {
        return None;
    }
    let microscope = instrument.microscope.as_ref();
    Some(InstrumentInput {
        name: instrument.id.clone(),
        lot_number: microscope.and_then(|m| m.lot_number.clone()),
        serial_number: microscope.and_then(|m| m.serial_number.clone()),
        manufacturer: microscope.and_then(|m| m.manufacturer.clone()),
        model: microscope.and_then(|m| m.model.clone()),
    })
}

/// Created instruments keyed by their source identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentMap {
    by_id: HashMap<String, EntityRef>,
}

impl InstrumentMap {
    /// Create every identifiable instrument remotely and index the results.
    ///
    /// Instruments with an empty identifier are skipped.
    pub async fn create<C>(client: &C, instruments: &[Instrument]) -> Result<Self, SubmitError>
    where
        C: SubmissionClient + ?Sized,
    {
        let mut map = Self::default();
        for instrument in instruments {
            let Some(input) = instrument_input(instrument) else {
                debug!("Skipping instrument without identifier");
                continue;
            };
            let created = client.create_instrument(&input).await?;
            map.insert(instrument.id.clone(), created);
        }
        Ok(map)
    }

    pub fn insert(&mut self, id: impl Into<String>, entity: EntityRef) {
        self.by_id.insert(id.into(), entity);
    }

    /// Look up an instrument reference; absent and unknown ids yield `None`.
    pub fn get(&self, id: Option<&str>) -> Option<&EntityRef> {
        id.and_then(|id| self.by_id.get(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
