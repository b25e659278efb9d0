use anyhow::Result;
use pipesh::Interpreter;

fn main() -> Result<()> {
    Interpreter::new().repl()
}
