//! WASM bindings for wdf_core.
//!
//! JavaScript-friendly wrapper for running a tree inside a Web Audio
//! AudioWorklet.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmWdfTree } from 'wdf_core';
//!
//! await init();
//!
//! const description = `
//!   RV  VIN 1k
//!   C   C1  10n
//!   PAR P1  VIN C1
//!   .junction J1 (1 0) (1 0)
//!   .root nl J1 P1 with diode_pair
//!   .input VIN
//!   .output voltage C1
//! `;
//!
//! const tree = new WasmWdfTree(description, 48000);
//!
//! // In AudioWorkletProcessor.process():
//! tree.process_block(input, output);
//! ```

use wasm_bindgen::prelude::*;

use crate::dsl;
use crate::tree::{TreeConfig, WdfTree};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(err: crate::error::WdfError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// A WDF tree driven from JavaScript.
#[wasm_bindgen]
pub struct WasmWdfTree {
    tree: WdfTree,
}

#[wasm_bindgen]
impl WasmWdfTree {
    /// Build a tree from a description. `sample_rate` overrides any
    /// `.samplerate` line.
    ///
    /// # Example
    /// ```javascript
    /// const tree = new WasmWdfTree(description, 48000);
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(description: &str, sample_rate: f64) -> Result<WasmWdfTree, JsValue> {
        let ast = dsl::parse(description).map_err(to_js)?;
        let config = ast.config(TreeConfig::default()).with_sample_rate(sample_rate);
        Self::build(&ast, config)
    }

    /// Build a tree with explicit Newton-Raphson settings.
    #[wasm_bindgen]
    pub fn with_config(
        description: &str,
        sample_rate: f64,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<WasmWdfTree, JsValue> {
        let ast = dsl::parse(description).map_err(to_js)?;
        let config = ast
            .config(TreeConfig::default())
            .with_sample_rate(sample_rate)
            .with_max_iterations(max_iterations)
            .with_tolerance(tolerance);
        Self::build(&ast, config)
    }

    fn build(ast: &dsl::TreeAst, config: TreeConfig) -> Result<WasmWdfTree, JsValue> {
        let tree = WdfTree::from_ast(ast, config).map_err(to_js)?;
        Ok(WasmWdfTree { tree })
    }

    /// Process a block of mono samples.
    ///
    /// # Example (AudioWorklet)
    /// ```javascript
    /// class WdfProcessor extends AudioWorkletProcessor {
    ///   process(inputs, outputs) {
    ///     const input = inputs[0][0];
    ///     const output = outputs[0][0];
    ///     if (input && output) {
    ///       this.tree.process_block(input, output);
    ///     }
    ///     return true;
    ///   }
    /// }
    /// ```
    #[wasm_bindgen]
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        self.tree.process_block(input, output);
    }

    /// Process a block, returning a new array.
    #[wasm_bindgen]
    pub fn process_block_alloc(&mut self, input: &[f32]) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        self.tree.process_block(input, &mut output);
        output
    }

    /// Clear all reactive state.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.tree.reset();
    }

    /// Samples on which Newton-Raphson did not converge.
    #[wasm_bindgen]
    pub fn failures(&self) -> u64 {
        self.tree.stats().map_or(0, |s| s.failures)
    }

    #[wasm_bindgen(getter)]
    pub fn sample_rate(&self) -> f64 {
        self.tree.sample_rate()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
