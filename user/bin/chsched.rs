#![no_std]
#![no_main]

use user::*;

#[unsafe(no_mangle)]
fn main(args: Args) {
    if args.len() != 4 {
        exit_with_msg("usage: chsched algorithm is_preemptive a");
    }

    let mut parts = args.args_as_str();
    let Some(algorithm) = parts.next().and_then(|s| s.parse::<i32>().ok()) else {
        exit_with_msg("chsched: invalid algorithm");
    };
    let Some(is_preemptive) = parts.next().and_then(|s| s.parse::<i32>().ok()) else {
        exit_with_msg("chsched: invalid is_preemptive");
    };
    let Some(a) = parts.next().and_then(|s| s.parse::<i32>().ok()) else {
        exit_with_msg("chsched: invalid a");
    };

    let ret = chsched(algorithm, is_preemptive, a);
    if ret == 0 {
        println!("algorithm: {}", if algorithm == 0 { "SJF" } else { "CFS" });
        if algorithm == 0 {
            println!("is_preemptive: {}", is_preemptive);
            println!("a: {}", a);
        }
    }
    println!("return code: {}", ret);
}
