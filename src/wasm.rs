#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::config::SimConfig;
use crate::error::DualError;
use crate::node::{LinkId, NodeId};
use crate::simulation::Simulator;

fn js_err(e: DualError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// JS numbers carry ids and counts as `u32`; refuse anything wider.
fn narrow<T>(value: T, what: &str) -> Result<u32, String>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| format!("{} {} does not fit in u32", what, value))
}

fn to_js<T>(value: T, what: &str) -> Result<u32, JsValue>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    narrow(value, what).map_err(|msg| JsValue::from_str(&msg))
}

/// WASM binding for [`Simulator`].
///
/// Ids cross the boundary as plain integers; every observation is a JSON
/// string produced by the snapshot API.
#[wasm_bindgen(js_name = Simulator)]
pub struct WasmSimulator {
    sim: Simulator,
}

#[wasm_bindgen(js_class = Simulator)]
impl WasmSimulator {
    /// Empty simulator. `config_json` may be empty for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSimulator, JsValue> {
        console_error_panic_hook::set_once();
        let config = if config_json.trim().is_empty() {
            SimConfig::default()
        } else {
            SimConfig::from_json(config_json).map_err(js_err)?
        };
        Ok(WasmSimulator {
            sim: Simulator::new(config).map_err(js_err)?,
        })
    }

    pub fn create_node(&mut self, name: &str) -> Result<u32, JsValue> {
        let id = self.sim.create_node(name).map_err(js_err)?;
        to_js(id.raw(), "node id")
    }

    pub fn create_link(&mut self, a: u32, b: u32, cost: f64) -> Result<u32, JsValue> {
        let id = self
            .sim
            .create_link(NodeId::new(u64::from(a)), NodeId::new(u64::from(b)), cost)
            .map_err(js_err)?;
        to_js(id.raw(), "link id")
    }

    pub fn finalize_topology(&mut self) -> Result<(), JsValue> {
        self.sim.finalize_topology().map_err(js_err)
    }

    pub fn pin_destination(&mut self, node: u32) -> Result<(), JsValue> {
        self.sim.pin_destination(NodeId::new(u64::from(node))).map_err(js_err)
    }

    pub fn inject_initial_advertisement(&mut self, node: u32) -> Result<u32, JsValue> {
        let sent = self
            .sim
            .inject_initial_advertisement(NodeId::new(u64::from(node)))
            .map_err(js_err)?;
        to_js(sent, "message count")
    }

    /// Deliver one round. Returns `false` once nothing is pending.
    pub fn step(&mut self) -> Result<bool, JsValue> {
        self.sim.step().map(|r| r.is_some()).map_err(js_err)
    }

    /// Run to quiescence. Returns `true` if the network converged.
    pub fn run(&mut self) -> Result<bool, JsValue> {
        self.sim.run_to_quiescence().map(|r| r.converged()).map_err(js_err)
    }

    pub fn change_link_cost(&mut self, link: u32, cost: f64) -> Result<(), JsValue> {
        self.sim
            .change_link_cost(LinkId::new(u64::from(link)), cost)
            .map(|_| ())
            .map_err(js_err)
    }

    pub fn remove_link(&mut self, link: u32) -> Result<(), JsValue> {
        self.sim
            .remove_link(LinkId::new(u64::from(link)))
            .map(|_| ())
            .map_err(js_err)
    }

    pub fn state_json(&self) -> String {
        self.sim.state_json()
    }

    pub fn trace_json(&self) -> String {
        self.sim.trace_json()
    }

    pub fn is_converged(&self) -> bool {
        self.sim.is_converged()
    }
}
