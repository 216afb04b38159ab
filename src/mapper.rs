mod nrom;
mod uxrom;
mod mmc1;
mod mmc3;

pub use nrom::NRom;
pub use uxrom::UxRom;
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;

use crate::{banks::MemConfig, cart::{CartError, CartHeader, Mirroring}};

#[typetag::serde]
pub trait Mapper {
  fn new(header: &CartHeader, cfg: &mut MemConfig) -> Box<Self> where Self: Sized;

  /// iNES mapper number.
  fn id(&self) -> u16;

  /// Back to power-on registers and pages.
  fn reset(&mut self, cfg: &mut MemConfig);

  /// Write to $8000-$FFFF, where the registers live.
  fn prg_write(&mut self, cfg: &mut MemConfig, addr: usize, val: u8);

  // $4020-$5FFF expansion area, open bus on most boards
  fn cart_read(&mut self, _addr: usize) -> u8 { 0 }
  fn cart_write(&mut self, _cfg: &mut MemConfig, _addr: usize, _val: u8) {}

  fn sram_read_enabled(&self) -> bool { true }
  fn sram_write_enabled(&self) -> bool { true }

  // Ppu address bus, sampled every ppu cycle
  fn ppu_tick(&mut self, _addr: u16) {}

  fn mirroring(&self) -> Option<Mirroring> { None }

  fn poll_irq(&self) -> bool { false }
  fn ack_irq(&mut self) {}
}

struct MapperInfo {
  id: u16,
  name: &'static str,
  min_prg_banks: usize,
  max_prg_banks: usize,
}

const MAPPERS_TABLE: [MapperInfo; 4] = [
  MapperInfo { id: 0, name: "NRom",  min_prg_banks: 1, max_prg_banks: 2 },
  MapperInfo { id: 1, name: "MMC1",  min_prg_banks: 1, max_prg_banks: 32 },
  MapperInfo { id: 2, name: "UxRom", min_prg_banks: 2, max_prg_banks: 256 },
  MapperInfo { id: 4, name: "MMC3",  min_prg_banks: 2, max_prg_banks: 32 },
];

pub fn mapper_name(id: u16) -> &'static str {
  MAPPERS_TABLE.iter()
    .find(|m| m.id == id)
    .map(|m| m.name)
    .unwrap_or("Not implemented")
}

pub fn new_mapper(header: &CartHeader, cfg: &mut MemConfig) -> Result<Box<dyn Mapper>, CartError> {
  let info = MAPPERS_TABLE.iter()
    .find(|m| m.id == header.mapper)
    .ok_or(CartError::UnsupportedMapper(header.mapper))?;

  if !(info.min_prg_banks..=info.max_prg_banks).contains(&header.prg_16kb_banks) {
    return Err(CartError::BankCount {
      mapper: info.id,
      name: info.name,
      min: info.min_prg_banks,
      max: info.max_prg_banks,
      found: header.prg_16kb_banks,
    });
  }

  let mapper: Box<dyn Mapper> = match header.mapper {
    0 => NRom::new(header, cfg),
    1 => Mmc1::new(header, cfg),
    2 => UxRom::new(header, cfg),
    4 => Mmc3::new(header, cfg),
    _ => return Err(CartError::UnsupportedMapper(header.mapper)),
  };

  Ok(mapper)
}
