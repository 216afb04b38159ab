use log::trace;

use crate::{banks::{Banking, MemConfig}, cart::CartHeader};
use super::Mapper;

// Mapper 00
// https://www.nesdev.org/wiki/NROM
#[derive(serde::Serialize, serde::Deserialize)]
pub struct NRom;

#[typetag::serde]
impl Mapper for NRom {
  fn new(header: &CartHeader, cfg: &mut MemConfig) -> Box<Self> {
    cfg.prg = Banking::new_prg(header, 2);
    cfg.chr = Banking::new_chr(header, 1);

    let mut mapper = Self;
    mapper.reset(cfg);
    Box::new(mapper)
  }

  fn id(&self) -> u16 { 0 }

  fn reset(&mut self, cfg: &mut MemConfig) {
    // if it only has 16KiB, both pages land on the same bank
    cfg.prg.set_page(0, 0);
    cfg.prg.set_page_to_last_bank(1);
    cfg.chr.set_page(0, 0);
  }

  fn prg_write(&mut self, _: &mut MemConfig, addr: usize, val: u8) {
    trace!("NRom write ${addr:04X} = {val:02X} ignored");
  }
}
