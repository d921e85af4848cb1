// Keyboard teleop: WASD move, Z/X rotate, R/F speed, C frame toggle,
// H drive home, O zero pose, Space cancel goal, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use lekiwi_holonomic_drive::config::{
    TOPIC_CMD_BASE, TOPIC_CMD_CANCEL, TOPIC_CMD_GOAL, TOPIC_CMD_POSE_RESET,
};
use lekiwi_holonomic_drive::messages::{BaseCommand, GoalCommand, PoseMessage};
use std::time::{Duration, Instant};
use tracing::info;

const SPEEDS: [f64; 3] = [0.05, 0.15, 0.3]; // m/s
const THETA_SPEEDS: [f64; 3] = [15.0, 45.0, 90.0]; // deg/s
const INPUT_TIMEOUT_MS: u64 = 100; // Reset velocities after this much time with no input

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Publishers<'a> {
    cmd: zenoh::pubsub::Publisher<'a>,
    goal: zenoh::pubsub::Publisher<'a>,
    cancel: zenoh::pubsub::Publisher<'a>,
    pose_reset: zenoh::pubsub::Publisher<'a>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let publishers = Publishers {
        cmd: session.declare_publisher(TOPIC_CMD_BASE).await?,
        goal: session.declare_publisher(TOPIC_CMD_GOAL).await?,
        cancel: session.declare_publisher(TOPIC_CMD_CANCEL).await?,
        pose_reset: session.declare_publisher(TOPIC_CMD_POSE_RESET).await?,
    };

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, C=robot/field frame, H=home, O=zero pose, Space=cancel, Q=quit");
    info!("Speed: LOW, frame: robot");

    enable_raw_mode()?;
    let result = run_teleop(&publishers).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(publishers: &Publishers<'_>) -> Result<(), BoxError> {
    let mut speed_idx: usize = 0;
    let mut field_centric = false;

    // Persistent velocity state
    let mut x_vel = 0.0;
    let mut y_vel = 0.0;
    let mut theta_vel = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Movement - update velocity and refresh timestamp
                    KeyCode::Char('w') if pressed => {
                        x_vel = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        x_vel = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        y_vel = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        y_vel = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation
                    KeyCode::Char('z') if pressed => {
                        theta_vel = THETA_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        theta_vel = -THETA_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char('c') if pressed => {
                        field_centric = !field_centric;
                        info!("Frame: {}", if field_centric { "field" } else { "robot" });
                    }

                    // Goals
                    KeyCode::Char('h') if pressed => {
                        let home = GoalCommand {
                            x: 0.0,
                            y: 0.0,
                            heading_deg: 0.0,
                            tolerance_m: None,
                            tolerance_deg: None,
                            timeout_s: None,
                        };
                        publishers.goal.put(serde_json::to_string(&home)?).await?;
                        info!("Driving home");
                    }
                    KeyCode::Char('o') if pressed => {
                        let origin = PoseMessage {
                            x: 0.0,
                            y: 0.0,
                            heading_deg: 0.0,
                        };
                        publishers.pose_reset.put(serde_json::to_string(&origin)?).await?;
                        info!("Pose zeroed");
                    }
                    KeyCode::Char(' ') if pressed => {
                        publishers.cancel.put("{}".to_string()).await?;
                        info!("Cancel sent");
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset velocities if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            x_vel = 0.0;
            y_vel = 0.0;
            theta_vel = 0.0;
        }

        // Always publish at ~50Hz; zeros keep the watchdog fed without
        // interrupting a goal
        let cmd = BaseCommand {
            x_vel,
            y_vel,
            theta_vel,
            field_centric,
        };
        publishers.cmd.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
