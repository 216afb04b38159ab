use bitfield_struct::bitfield;
use log::trace;

use crate::{banks::{Banking, MemConfig}, cart::{CartHeader, Mirroring}};
use super::Mapper;

#[bitfield(u8, order = Lsb)]
struct Control {
  #[bits(2)]
  mirroring: u8,
  #[bits(2)]
  prg_mode: u8,
  chr_4kb: bool,
  #[bits(3)]
  __: u8,
}

const CTRL_POWER_ON: u8 = 0b0_1100;

// Mapper 01
// https://www.nesdev.org/wiki/MMC1
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Mmc1 {
  shift_reg: u8,
  shift_writes: u8,

  ctrl: u8,
  chr_bank0: u8,
  chr_bank1: u8,
  prg_bank: u8,
}

impl Mmc1 {
  fn commit(&mut self, addr: usize, val: u8) {
    trace!("MMC1 ${addr:04X} <- {val:05b}");
    match addr {
      0x8000..=0x9FFF => self.ctrl = val,
      0xA000..=0xBFFF => self.chr_bank0 = val,
      0xC000..=0xDFFF => self.chr_bank1 = val,
      _ => self.prg_bank = val,
    }
  }

  fn update_banks(&self, cfg: &mut MemConfig) {
    let ctrl = Control::from_bits(self.ctrl);

    // SUROM: 512KiB of prg, chr bank 0 bit 4 selects which 256KiB half is visible
    let surom = cfg.prg.banks_count > 16;
    let outer = if surom { self.chr_bank0 as isize & 0x10 } else { 0 };
    let bank = (self.prg_bank as isize & 0x0F) | outer;
    let last = if surom { outer | 0x0F } else { -1 };

    match ctrl.prg_mode() {
      0 | 1 => {
        cfg.prg.set_page(0, bank & !1);
        cfg.prg.set_page(1, bank | 1);
      }
      2 => {
        cfg.prg.set_page(0, outer);
        cfg.prg.set_page(1, bank);
      }
      _ => {
        cfg.prg.set_page(0, bank);
        cfg.prg.set_page(1, last);
      }
    }

    let (chr0, chr1) = (self.chr_bank0 as isize, self.chr_bank1 as isize);
    if ctrl.chr_4kb() {
      cfg.chr.set_page(0, chr0);
      cfg.chr.set_page(1, chr1);
    } else {
      cfg.chr.set_page(0, chr0 & !1);
      cfg.chr.set_page(1, chr0 | 1);
    }
  }
}

#[typetag::serde]
impl Mapper for Mmc1 {
  fn new(header: &CartHeader, cfg: &mut MemConfig) -> Box<Self> {
    cfg.prg = Banking::new_prg(header, 2);
    cfg.chr = Banking::new_chr(header, 2);

    let mut mapper = Self {
      shift_reg: 0, shift_writes: 0,
      ctrl: CTRL_POWER_ON,
      chr_bank0: 0, chr_bank1: 0, prg_bank: 0,
    };
    mapper.reset(cfg);
    Box::new(mapper)
  }

  fn id(&self) -> u16 { 1 }

  fn reset(&mut self, cfg: &mut MemConfig) {
    self.shift_reg = 0;
    self.shift_writes = 0;
    self.ctrl = CTRL_POWER_ON;
    self.chr_bank0 = 0;
    self.chr_bank1 = 0;
    self.prg_bank = 0;
    self.update_banks(cfg);
  }

  fn prg_write(&mut self, cfg: &mut MemConfig, addr: usize, val: u8) {
    if val & 0b1000_0000 != 0 {
      self.shift_reg = 0;
      self.shift_writes = 0;
      self.ctrl |= CTRL_POWER_ON;
      self.update_banks(cfg);
      return;
    }

    self.shift_reg = (self.shift_reg >> 1) | ((val & 1) << 4);
    self.shift_writes += 1;
    if self.shift_writes < 5 { return; }

    self.commit(addr, self.shift_reg);
    self.shift_reg = 0;
    self.shift_writes = 0;
    self.update_banks(cfg);
  }

  // prg ram is active low on MMC1B and later
  fn sram_read_enabled(&self) -> bool { self.prg_bank & 0x10 == 0 }
  fn sram_write_enabled(&self) -> bool { self.prg_bank & 0x10 == 0 }

  fn mirroring(&self) -> Option<Mirroring> {
    let mirroring = match Control::from_bits(self.ctrl).mirroring() {
      0 => Mirroring::SingleScreenA,
      1 => Mirroring::SingleScreenB,
      2 => Mirroring::Vertical,
      _ => Mirroring::Horizontal,
    };
    Some(mirroring)
  }
}
