use crate::compile::{Line, Mnemonic};
use crate::symbols::allocator::{Allocator, MEM_SIZE};
use crate::symbols::Width;
use color_print::{cformat, cprint, cprintln};
use itertools::Itertools;

/// Colored listing of the generated code followed by the memory map.
pub fn print_listing(mnemonics: &[Mnemonic], symbols: &Allocator) {
    println!("+-[Code]-+------------------------------------------------------------------------");
    let mut pc: usize = 0;
    for m in mnemonics {
        match &m.line {
            Line::Inst(inst) => {
                cprintln!("| {:>6} : {}", pc, inst.cformat());
                pc += 1;
            }
            Line::Raw { command, param } => {
                let param = param.as_deref().unwrap_or("");
                cprintln!("| {:>6} : <y>{}</> {}", pc, command, param);
                pc += 1;
            }
            Line::Label(label) => cprintln!("| <m>{}</m>:", label),
            other => cprintln!("|        <dim>{}</dim>", other),
        }
    }

    println!("+-[Data]-+------------------------------------------------------------------------");
    for var in symbols.vars().iter().sorted_by_key(|var| var.addr) {
        cprint!("| 0x{:03X} : 0x{:03X} | ", var.addr, var.top());
        if var.temp {
            cprint!("<yellow>{}</yellow>", var.name);
        } else {
            cprint!("<cyan>{}</cyan>", var.name);
        }
        cprintln!(" : {}", width_name(var.width));
    }
    for arr in symbols.arrays() {
        cprintln!(
            "| {}:0x{:03X} | <green>{}</green> : {}[{}]",
            arr.bank,
            arr.addr,
            arr.name,
            width_name(arr.width),
            arr.len
        );
    }
    println!("+--------+------------------------------------------------------------------------");
    println!("{}", usage(symbols));
}

/// One line summary of scalar memory use.
pub fn usage(symbols: &Allocator) -> String {
    let blocks = symbols
        .vars()
        .iter()
        .filter(|var| !var.temp)
        .map(|var| var.block.as_str())
        .filter(|block| !block.is_empty())
        .unique()
        .join(", ");
    cformat!(
        "<bold>{}</>/{} cells, {} arrays, blocks: {}",
        symbols.used(),
        MEM_SIZE,
        symbols.arrays().len(),
        blocks
    )
}

fn width_name(width: Width) -> &'static str {
    match width {
        Width::Nibble => "nibble",
        Width::Byte => "byte",
        Width::Word => "word",
    }
}
