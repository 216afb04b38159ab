use crate::{banks::{Banking, MemConfig}, cart::CartHeader};
use super::Mapper;

// Mapper 02
// https://www.nesdev.org/wiki/UxROM
#[derive(serde::Serialize, serde::Deserialize)]
pub struct UxRom;

#[typetag::serde]
impl Mapper for UxRom {
  fn new(header: &CartHeader, cfg: &mut MemConfig) -> Box<Self> {
    cfg.prg = Banking::new_prg(header, 2);
    cfg.chr = Banking::new_chr(header, 1);

    let mut mapper = Self;
    mapper.reset(cfg);
    Box::new(mapper)
  }

  fn id(&self) -> u16 { 2 }

  fn reset(&mut self, cfg: &mut MemConfig) {
    cfg.prg.set_page(0, 0);
    cfg.prg.set_page_to_last_bank(1);
    cfg.chr.set_page(0, 0);
  }

  fn prg_write(&mut self, cfg: &mut MemConfig, _: usize, val: u8) {
    cfg.prg.set_page(0, val as isize);
  }
}
