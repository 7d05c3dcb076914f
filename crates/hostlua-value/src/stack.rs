use crate::ScriptValue;

/// Argument/result window of one native call, as the scripting runtime hands it over.
/// Argument indices are zero-based; reading past the end yields nil.
#[derive(Debug, Default, Clone)]
pub struct CallFrame {
    args: Vec<ScriptValue>,
    results: Vec<ScriptValue>,
}

impl CallFrame {
    pub fn new(args: Vec<ScriptValue>) -> Self {
        Self {
            args,
            results: vec![],
        }
    }

    pub fn arg(&self, index: usize) -> &ScriptValue {
        static NIL: ScriptValue = ScriptValue::Nil;
        self.args.get(index).unwrap_or(&NIL)
    }

    pub fn args(&self) -> &[ScriptValue] {
        &self.args
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn push(&mut self, value: ScriptValue) {
        self.results.push(value);
    }

    pub fn results(&self) -> &[ScriptValue] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ScriptValue> {
        self.results
    }

    /// First result, or nil.
    pub fn first_result(&self) -> ScriptValue {
        self.results.first().cloned().unwrap_or_default()
    }
}
