use conduit_communication::{rendezvous, CancellationToken, Handoff, Pull, Push};

fn main() {
    // one token for both edges; signalling it releases whichever side is blocked.
    let token = CancellationToken::new();
    let (mut senders, mut receivers): (Vec<_>, Vec<_>) = (0 .. 2).map(|_| rendezvous(token.clone())).unzip();

    // each sender thread owns one edge.
    let threads = senders.drain(..).enumerate().map(|(index, mut sender)| {
        std::thread::spawn(move || {
            let mut sent = 0;
            while sender.push(format!("hello from {}, round {}", index, sent)) == Handoff::Delivered {
                sent += 1;
            }
            sent
        })
    }).collect::<Vec<_>>();

    // read a few rounds from each edge, then stop everyone.
    for round in 0 .. 3 {
        for (index, receiver) in receivers.iter_mut().enumerate() {
            if let Some(message) = receiver.pull() {
                println!("round {}, edge {}: received <{}>", round, index, message);
            }
        }
    }
    token.cancel();

    for (index, thread) in threads.into_iter().enumerate() {
        match thread.join() {
            Ok(sent) => println!("sender {} delivered {} messages", index, sent),
            Err(_) => println!("sender {} panicked", index),
        }
    }
}
