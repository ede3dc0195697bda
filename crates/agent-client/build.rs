fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Compile the agent runtime proto for the client (and the test server)
    tonic_build::compile_protos("../../proto/agent.proto")?;
    Ok(())
}
