use opencl::{
    CommandQueueProperties, Context, DeviceType, MemFlags, Result, Runtime, padded_global_size,
};

const SOURCE: &str = r#"
__kernel void square(
   __global float* input,
   __global float* output,
   const unsigned int count)
{
   int i = get_global_id(0);
   if(i < count)
       output[i] = input[i] * input[i];
}
"#;

const COUNT: usize = 1024;

fn main() -> Result<()> {
    let runtime = Runtime::load()?;

    for platform in runtime.platforms()? {
        println!("Platform: {} ({})", platform.name()?, platform.version()?);
        for device in platform.devices(DeviceType::ALL)? {
            println!(
                "  {} [{}], {} compute units, {} MiB global memory",
                device.name()?,
                device.device_type()?,
                device.max_compute_units()?,
                device.global_mem_size()? >> 20
            );
        }
    }

    let devices = runtime.devices(None, DeviceType::DEFAULT)?;
    let device = &devices[0];
    let context = Context::create(&devices[..1])?;
    let queue = context.create_command_queue(device, CommandQueueProperties::PROFILING_ENABLE)?;

    let program = context.create_program_with_source(&[SOURCE])?;
    if let Err(e) = program.build(None, "") {
        eprintln!("Build failed:\n{}", e);
        return Err(e);
    }
    let kernel = program.create_kernel("square")?;

    let data: Vec<f32> = (0..COUNT).map(|i| i as f32 / COUNT as f32).collect();
    let input = context.create_buffer_from_slice(MemFlags::READ_ONLY, &data)?;
    let output = context.create_empty_buffer(MemFlags::WRITE_ONLY, COUNT * 4)?;

    kernel.set_arg_buffer(0, &input)?;
    kernel.set_arg_buffer(1, &output)?;
    kernel.set_arg_u32(2, COUNT as u32)?;

    // local size from the kernel, global size padded to fit
    let local = kernel.work_group_size(Some(device))?;
    let global = padded_global_size(COUNT, local);
    let dispatch = queue.enqueue_nd_range_kernel(&kernel, None, &[global], Some(&[local]), &[])?;
    queue.finish()?;

    let start = dispatch.profiling_info(opencl::ProfilingInfo::Start)?;
    let end = dispatch.profiling_info(opencl::ProfilingInfo::End)?;
    println!("Kernel ran in {} ns", end.saturating_sub(start));

    let mut results = vec![0.0f32; COUNT];
    queue.read_buffer_f32(&output, 0, &mut results, &[])?;

    let correct = data
        .iter()
        .zip(&results)
        .filter(|&(x, y)| *y == x * x)
        .count();
    println!("Computed '{}/{}' correct values!", correct, COUNT);

    Ok(())
}
