use winit::event_loop::{ControlFlow, EventLoop};

use emberfield::App;

fn main() {
    env_logger::init();

    println!("Controls:");
    println!("  W/A/S/D    move camera");
    println!("  mouse      look around (Space toggles free-look)");
    println!("  scroll     zoom");
    println!("  R          toggle auto-orbit");
    println!("  H          toggle HDR tone mapping");
    println!("  B          toggle bloom");
    println!("  Q/E        exposure down/up");
    println!("  Esc        quit");

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new("assets/models");
    event_loop.run_app(&mut app).unwrap();
}
