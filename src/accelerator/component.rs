/// a clocked unit, one call to `cycle` is one rising clock edge
pub trait Component {
    fn cycle(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
