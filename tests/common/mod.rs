#![allow(dead_code)]

use nen_mappers::{Cart, CartHeader, Mirroring};

pub fn init_log() {
  let _ = colog::basic_builder().is_test(true).try_init();
}

// every byte holds the index of the 1KiB chunk it lives in,
// so a read tells which bank got mapped at any granularity
pub fn marked(size: usize) -> Vec<u8> {
  (0..size).map(|i| (i / 1024) as u8).collect()
}

pub fn cart(mapper: u16, prg_banks: usize, chr_banks: usize, mirroring: Mirroring) -> Cart {
  init_log();
  let header = CartHeader::new(mapper, prg_banks, chr_banks, mirroring, true);
  let prg = marked(header.prg_size());
  let chr = marked(header.chr_size());
  Cart::with_header(header, prg, chr).unwrap()
}

/// Bank number as seen through a 1KiB-marked rom.
pub fn bank_of(mark: u8, bank_kb: usize) -> usize {
  mark as usize / bank_kb
}

pub fn mmc1_load(cart: &mut Cart, addr: u16, val: u8) {
  for i in 0..5 {
    cart.cpu_write(addr, (val >> i) & 1);
  }
}

pub fn mmc3_rising_edge(cart: &mut Cart) {
  for _ in 0..8 {
    cart.ppu_tick(0x0000);
  }
  cart.ppu_tick(0x1000);
}
