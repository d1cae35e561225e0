// cargo fuzz run decode corpus/decode -- -timeout=30

#![no_main]

use libfuzzer_sys::fuzz_target;

use marquee::{Decoder, MemoryStream, NullSink, Step};

fuzz_target!(|data: &[u8]| {
    let mut dec = Decoder::new(MemoryStream::new(data));
    if dec.start_decoding().is_err() {
        return;
    }
    loop {
        match dec.decode_next_frame(&mut NullSink) {
            Ok(Step::Frame { .. }) => (),
            _ => return,
        }
    }
});
